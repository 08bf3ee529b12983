use atoi::FromRadix10Checked;
use bstr::ByteSlice;
use memchr::memchr_iter;

/// Split a record into fields at `delim`, treating a run of delimiters as one.
///
/// Leading and trailing delimiters never produce empty fields.
#[inline]
pub fn bs_split_fields(bytes: &[u8], delim: u8) -> Vec<&[u8]> {
    let mut fields = Vec::with_capacity(10);
    let mut start = 0;
    for end in memchr_iter(delim, bytes) {
        if end > start {
            fields.push(&bytes[start..end]);
        }
        start = end + 1;
    }
    if start < bytes.len() {
        fields.push(&bytes[start..]);
    }
    fields
}

/// Split a record at any run of whitespace.
#[inline]
pub fn bs_split_whitespace(bytes: &[u8]) -> Vec<&[u8]> {
    bytes.fields().collect()
}

/// Parse an unsigned decimal, rejecting empty input, signs, trailing bytes and overflow.
#[inline]
pub fn bs_atoi(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }
    match usize::from_radix_10_checked(bytes) {
        (Some(n), used) if used == bytes.len() => Some(n),
        _ => None,
    }
}

/// Strip the `\n` or `\r\n` line terminator.
///
/// Other whitespace is kept, so only a line with nothing on it is blank.
#[inline]
pub fn bs_trim_line(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}
