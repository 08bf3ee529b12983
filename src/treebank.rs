//! Sentiment treebank reading
//!
//! Parses a CoNLL-style file, one token per line with a blank line after
//! every sentence, into `(tree, label)` examples. Fields are
//!
//! ```text
//! id  token  _  sentiment  _  _  head  deprel  ...
//! ```
//!
//! Only the sentiment field of the root line (head `0`) is consulted; it
//! becomes the sentence label. Tokens, relations and labels are interned
//! into the caller's [`Vocabularies`] as they are read.

use crate::bytes::{bs_atoi, bs_split_fields, bs_split_whitespace, bs_trim_line};
use crate::dictionary::{DictError, SymbolId, Vocabularies};
use crate::tree::{DepTree, NodeId, ROOT, TreeError};
use bstr::ByteSlice;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const ID_FIELD: usize = 0;
const TOKEN_FIELD: usize = 1;
const SENTIMENT_FIELD: usize = 3;
const HEAD_FIELD: usize = 6;
const DEPREL_FIELD: usize = 7;
const MIN_FIELDS: usize = 8;

/// Placeholder for an empty field
const EMPTY_FIELD: &[u8] = b"_";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Error while reading a treebank
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: malformed record: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("line {line}: sentence has no root line to take a label from")]
    MissingLabel { line: usize },

    #[error("line {line}: malformed tree: {source}")]
    MalformedTree { line: usize, source: TreeError },

    #[error("line {line}: {source}")]
    Symbol { line: usize, source: DictError },

    #[error("line {line}: input ends inside a sentence (missing blank line)")]
    UnterminatedSentence { line: usize },
}

pub type Result<T> = std::result::Result<T, CorpusError>;

/// How fields are separated within a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldDelimiter {
    /// Runs of tabs
    #[default]
    Tab,
    /// Runs of any whitespace
    Whitespace,
}

/// Reader settings
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderConfig {
    pub delimiter: FieldDelimiter,
}

/// A sentence tree and its sentiment label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub tree: DepTree,
    pub label: SymbolId,
}

/// Counts gathered while reading a treebank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub sentences: usize,
    pub tokens: usize,
}

/// A fully read treebank split
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub examples: Vec<Example>,
    pub stats: CorpusStats,
}

impl Dataset {
    #[inline]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Example> {
        self.examples.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Example;
    type IntoIter = std::slice::Iter<'a, Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.iter()
    }
}

impl IntoIterator for Dataset {
    type Item = Example;
    type IntoIter = std::vec::IntoIter<Example>;

    fn into_iter(self) -> Self::IntoIter {
        self.examples.into_iter()
    }
}

/// Per-sentence accumulators
#[derive(Default)]
struct SentenceBuilder {
    parents: Vec<NodeId>,
    relations: Vec<SymbolId>,
    tokens: Vec<SymbolId>,
    /// Node attached to `ROOT`, if seen
    root: Option<NodeId>,
    label: Option<SymbolId>,
}

impl SentenceBuilder {
    fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn finish(&mut self, line: usize) -> Result<Example> {
        self.root = None;
        let label = self.label.take().ok_or(CorpusError::MissingLabel { line })?;
        let tree = DepTree::new(
            std::mem::take(&mut self.parents),
            std::mem::take(&mut self.relations),
            std::mem::take(&mut self.tokens),
        )
        .map_err(|source| CorpusError::MalformedTree { line, source })?;
        Ok(Example { tree, label })
    }
}

/// Treebank reader that iterates over examples
///
/// Holds the vocabularies mutably for the length of the pass.
pub struct TreebankReader<'v, R: BufRead> {
    input: R,
    vocab: &'v mut Vocabularies,
    config: ReaderConfig,
    buf: Vec<u8>,
    line_num: usize,
    sentence: SentenceBuilder,
    stats: CorpusStats,
    failed: bool,
}

impl<'v> TreebankReader<'v, Box<dyn BufRead>> {
    /// Create a reader from a file path, decompressing gzip input
    pub fn from_file(path: impl AsRef<Path>, vocab: &'v mut Vocabularies) -> Result<Self> {
        Self::from_file_with_config(path, vocab, ReaderConfig::default())
    }

    pub fn from_file_with_config(
        path: impl AsRef<Path>,
        vocab: &'v mut Vocabularies,
        config: ReaderConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        let input = open_file(path).map_err(|source| CorpusError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_config(input, vocab, config))
    }
}

impl<'v> TreebankReader<'v, Cursor<Vec<u8>>> {
    /// Create a reader from an in-memory string
    pub fn from_string(text: &str, vocab: &'v mut Vocabularies) -> Self {
        Self::new(Cursor::new(text.as_bytes().to_vec()), vocab)
    }
}

impl<'v, R: BufRead> TreebankReader<'v, R> {
    pub fn new(input: R, vocab: &'v mut Vocabularies) -> Self {
        Self::with_config(input, vocab, ReaderConfig::default())
    }

    pub fn with_config(input: R, vocab: &'v mut Vocabularies, config: ReaderConfig) -> Self {
        Self {
            input,
            vocab,
            config,
            buf: Vec::with_capacity(256),
            line_num: 0,
            sentence: SentenceBuilder::default(),
            stats: CorpusStats::default(),
            failed: false,
        }
    }

    /// Counts of the sentences yielded so far and their tokens
    ///
    /// Records of a sentence still being read are not counted.
    pub fn stats(&self) -> CorpusStats {
        self.stats
    }

    /// Read every remaining example.
    ///
    /// The first error aborts the read and nothing is returned. The
    /// vocabularies keep whatever was interned before the error.
    pub fn read_all(mut self) -> Result<Dataset> {
        let examples = self.by_ref().collect::<Result<Vec<_>>>()?;
        let stats = self.stats;
        info!(
            "{} sentences, {} tokens, {} types -- {} tags in data set",
            stats.sentences,
            stats.tokens,
            self.vocab.tokens.len(),
            self.vocab.tags.len()
        );
        Ok(Dataset { examples, stats })
    }

    fn next_example(&mut self) -> Option<Result<Example>> {
        loop {
            self.buf.clear();
            match self.input.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    // EOF
                    if self.sentence.is_empty() {
                        return None;
                    }
                    return Some(Err(CorpusError::UnterminatedSentence {
                        line: self.line_num,
                    }));
                }
                Ok(_) => self.line_num += 1,
                Err(e) => return Some(Err(CorpusError::Io(e))),
            }

            // Take the line out of `self` so records can intern into the vocabularies
            let buf = std::mem::take(&mut self.buf);
            let line = bs_trim_line(&buf);
            let result = if line.is_empty() {
                if self.sentence.is_empty() {
                    // Leading or repeated blank line
                    Ok(None)
                } else {
                    self.end_sentence().map(Some)
                }
            } else if line.starts_with(b"#") {
                Ok(None)
            } else {
                self.read_record(line).map(|()| None)
            };
            self.buf = buf;

            match result {
                Ok(Some(example)) => return Some(Ok(example)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn end_sentence(&mut self) -> Result<Example> {
        let example = self.sentence.finish(self.line_num)?;
        self.stats.sentences += 1;
        self.stats.tokens += example.tree.len();
        debug!(
            line = self.line_num,
            nodes = example.tree.len(),
            label = example.label,
            "sentence"
        );
        Ok(example)
    }

    /// Parse one token line into the current sentence
    fn read_record(&mut self, line: &[u8]) -> Result<()> {
        let line_num = self.line_num;
        let malformed = |message: String| CorpusError::MalformedRecord {
            line: line_num,
            message,
        };

        let fields = match self.config.delimiter {
            FieldDelimiter::Tab => bs_split_fields(line, b'\t'),
            FieldDelimiter::Whitespace => bs_split_whitespace(line),
        };
        if fields.len() < MIN_FIELDS {
            return Err(malformed(format!(
                "expected at least {} fields, found {}",
                MIN_FIELDS,
                fields.len()
            )));
        }

        // Numeric and structural checks come before any interning
        let id = bs_atoi(fields[ID_FIELD])
            .ok_or_else(|| malformed(format!("invalid ID: {}", fields[ID_FIELD].as_bstr())))?;
        let expected = self.sentence.parents.len() + 1;
        if id != expected {
            return Err(malformed(format!("expected ID {}, found {}", expected, id)));
        }
        let head = bs_atoi(fields[HEAD_FIELD])
            .ok_or_else(|| malformed(format!("invalid HEAD: {}", fields[HEAD_FIELD].as_bstr())))?;
        if head == ROOT {
            if let Some(first) = self.sentence.root {
                return Err(CorpusError::MalformedTree {
                    line: line_num,
                    source: TreeError::MultipleRoots { first, second: id },
                });
            }
        }

        let token = field_str(fields[TOKEN_FIELD], "token", line_num)?;
        let deprel = field_str(fields[DEPREL_FIELD], "deprel", line_num)?;
        let sentiment = if head == ROOT {
            let raw = fields[SENTIMENT_FIELD];
            if raw == EMPTY_FIELD {
                return Err(malformed("root line has no sentiment tag".to_string()));
            }
            Some(field_str(raw, "sentiment tag", line_num)?)
        } else {
            None
        };

        let symbol = |source: DictError| CorpusError::Symbol {
            line: line_num,
            source,
        };
        let token = self.vocab.tokens.intern(token).map_err(symbol)?;
        let deprel = self.vocab.relations.intern(deprel).map_err(symbol)?;
        if let Some(tag) = sentiment {
            self.sentence.label = Some(self.vocab.tags.intern(tag).map_err(symbol)?);
            self.sentence.root = Some(id);
        }

        self.sentence.parents.push(head);
        self.sentence.relations.push(deprel);
        self.sentence.tokens.push(token);
        Ok(())
    }
}

impl<R: BufRead> Iterator for TreebankReader<'_, R> {
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.next_example();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
        }
        item
    }
}

/// Read a whole treebank file into a dataset, interning into `vocab`
pub fn read_treebank(path: impl AsRef<Path>, vocab: &mut Vocabularies) -> Result<Dataset> {
    TreebankReader::from_file(path, vocab)?.read_all()
}

/// Read a whole treebank file with explicit settings
pub fn read_treebank_with_config(
    path: impl AsRef<Path>,
    vocab: &mut Vocabularies,
    config: ReaderConfig,
) -> Result<Dataset> {
    TreebankReader::from_file_with_config(path, vocab, config)?.read_all()
}

/// Open a file, sniffing the gzip magic number
fn open_file(path: &Path) -> std::io::Result<Box<dyn BufRead>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let is_gzip = match file.read_exact(&mut magic) {
        Ok(()) => magic == GZIP_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e),
    };

    // Reopen rather than seek so the decoder sees the whole stream
    let file = File::open(path)?;
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn field_str<'a>(bytes: &'a [u8], what: &str, line: usize) -> Result<&'a str> {
    bytes.to_str().map_err(|_| CorpusError::MalformedRecord {
        line,
        message: format!("{} is not valid UTF-8", what),
    })
}
