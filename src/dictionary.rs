//! Symbol dictionaries
//!
//! Map tokens, sentiment tags and dependency relations to dense integer ids
//! for the embedding tables of a downstream model. A dictionary grows while
//! the training corpus is read and is frozen before evaluation data is seen.

use lasso::{Key, Rodeo, Spur};
use rustc_hash::FxBuildHasher;
use std::fmt;
use thiserror::Error;

/// Dense symbol id, assigned in interning order starting at 0
pub type SymbolId = usize;

/// Error from a dictionary operation
#[derive(Debug, Error)]
pub enum DictError {
    /// The dictionary is frozen, the string is new, and no fallback is set.
    #[error("unknown symbol {0:?} in frozen dictionary")]
    UnknownSymbol(String),

    /// The id was never assigned.
    #[error("invalid symbol id {id} (dictionary has {len} entries)")]
    InvalidId { id: SymbolId, len: usize },

    /// The interner ran out of key space.
    #[error("symbol id space exhausted")]
    Exhausted,
}

/// Bidirectional string ↔ id map with a freeze/unknown lifecycle
pub struct SymbolDictionary {
    symbols: Rodeo<Spur, FxBuildHasher>,
    frozen: bool,
    unknown: Option<SymbolId>,
}

impl fmt::Debug for SymbolDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolDictionary")
            .field("len", &self.len())
            .field("frozen", &self.frozen)
            .field("unknown", &self.unknown)
            .finish()
    }
}

impl Default for SymbolDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolDictionary {
    pub fn new() -> Self {
        Self {
            symbols: Rodeo::with_hasher(FxBuildHasher),
            frozen: false,
            unknown: None,
        }
    }

    /// Get the id of `s`, assigning the next id if `s` is new.
    ///
    /// Once frozen, new strings resolve to the unknown id, or fail with
    /// [`DictError::UnknownSymbol`] when none is set. A frozen dictionary
    /// never grows through this method.
    pub fn intern(&mut self, s: &str) -> Result<SymbolId, DictError> {
        if let Some(id) = self.get(s) {
            return Ok(id);
        }
        if self.frozen {
            return self
                .unknown
                .ok_or_else(|| DictError::UnknownSymbol(s.to_string()));
        }
        self.insert(s)
    }

    /// Get the string for a previously assigned id
    pub fn lookup(&self, id: SymbolId) -> Result<&str, DictError> {
        Spur::try_from_usize(id)
            .and_then(|key| self.symbols.try_resolve(&key))
            .ok_or(DictError::InvalidId {
                id,
                len: self.len(),
            })
    }

    /// Get the id of `s` without interning it
    #[inline]
    pub fn get(&self, s: &str) -> Option<SymbolId> {
        self.symbols.get(s).map(Key::into_usize)
    }

    /// Stop assigning new ids. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Make `s` the fallback for out-of-vocabulary strings once frozen.
    ///
    /// This is part of the freezing setup, so it is the one operation
    /// allowed to add a string to a frozen dictionary.
    pub fn set_unknown(&mut self, s: &str) -> Result<SymbolId, DictError> {
        let id = match self.get(s) {
            Some(id) => id,
            None => self.insert(s)?,
        };
        self.unknown = Some(id);
        Ok(id)
    }

    /// The fallback id, if one is set
    pub fn unknown(&self) -> Option<SymbolId> {
        self.unknown
    }

    /// Number of distinct interned strings
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over `(id, string)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.symbols.iter().map(|(key, s)| (key.into_usize(), s))
    }

    fn insert(&mut self, s: &str) -> Result<SymbolId, DictError> {
        self.symbols
            .try_get_or_intern(s)
            .map(Key::into_usize)
            .map_err(|_| DictError::Exhausted)
    }
}

/// Embedding table sizes for the three vocabularies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabSizes {
    pub tokens: usize,
    pub tags: usize,
    pub relations: usize,
}

/// The token, sentiment-tag and relation dictionaries for one model
///
/// The three dictionaries are independent and never share ids.
#[derive(Debug, Default)]
pub struct Vocabularies {
    pub tokens: SymbolDictionary,
    pub tags: SymbolDictionary,
    pub relations: SymbolDictionary,
}

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze all three dictionaries after reading training data.
    ///
    /// `unknown` becomes the token fallback. Tags and relations get no
    /// fallback, so unseen ones stay an error.
    pub fn freeze_for_evaluation(&mut self, unknown: &str) -> Result<(), DictError> {
        self.tokens.freeze();
        self.tokens.set_unknown(unknown)?;
        self.tags.freeze();
        self.relations.freeze();
        Ok(())
    }

    pub fn sizes(&self) -> VocabSizes {
        VocabSizes {
            tokens: self.tokens.len(),
            tags: self.tags.len(),
            relations: self.relations.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dense_ids() {
        let mut dict = SymbolDictionary::new();
        assert_eq!(dict.intern("the").unwrap(), 0);
        assert_eq!(dict.intern("dog").unwrap(), 1);
        assert_eq!(dict.intern("the").unwrap(), 0);
        assert_eq!(dict.intern("runs").unwrap(), 2);
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_lookup_round_trip() {
        let mut dict = SymbolDictionary::new();
        for s in ["hello", "café", "你好", "hello"] {
            let id = dict.intern(s).unwrap();
            assert_eq!(dict.lookup(id).unwrap(), s);
        }
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn test_lookup_invalid_id() {
        let mut dict = SymbolDictionary::new();
        dict.intern("only").unwrap();

        match dict.lookup(1) {
            Err(DictError::InvalidId { id: 1, len: 1 }) => {}
            other => panic!("expected InvalidId, got {:?}", other),
        }
        assert!(dict.lookup(usize::MAX).is_err());
    }

    #[test]
    fn test_frozen_without_unknown_rejects() {
        let mut dict = SymbolDictionary::new();
        dict.intern("seen").unwrap();
        dict.freeze();

        assert_eq!(dict.intern("seen").unwrap(), 0);
        match dict.intern("unseen") {
            Err(DictError::UnknownSymbol(s)) => assert_eq!(s, "unseen"),
            other => panic!("expected UnknownSymbol, got {:?}", other),
        }
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_frozen_with_unknown_falls_back() {
        let mut dict = SymbolDictionary::new();
        dict.intern("a").unwrap();
        dict.intern("b").unwrap();
        dict.freeze();

        // set_unknown may intern into a frozen dictionary
        let unk = dict.set_unknown("UNK").unwrap();
        assert_eq!(unk, 2);
        assert_eq!(dict.unknown(), Some(2));
        let size = dict.len();

        assert_eq!(dict.intern("never-seen-before").unwrap(), unk);
        assert_eq!(dict.intern("another").unwrap(), unk);
        assert_eq!(dict.len(), size);

        // Known strings keep their ids
        assert_eq!(dict.intern("b").unwrap(), 1);
    }

    #[test]
    fn test_set_unknown_existing_symbol() {
        let mut dict = SymbolDictionary::new();
        dict.intern("UNK").unwrap();
        dict.intern("x").unwrap();
        dict.freeze();

        assert_eq!(dict.set_unknown("UNK").unwrap(), 0);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_debug_output() {
        let mut vocab = Vocabularies::new();
        vocab.tokens.intern("dog").unwrap();
        vocab.freeze_for_evaluation("UNK").unwrap();

        let debug = format!("{:?}", vocab.tokens);
        assert_eq!(
            debug,
            "SymbolDictionary { len: 2, frozen: true, unknown: Some(1) }"
        );
        assert!(format!("{:?}", vocab).starts_with("Vocabularies { tokens: SymbolDictionary"));
    }

    #[test]
    fn test_freeze_idempotent() {
        let mut dict = SymbolDictionary::new();
        dict.freeze();
        dict.freeze();
        assert!(dict.is_frozen());
        assert!(dict.is_empty());
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut dict = SymbolDictionary::new();
        assert_eq!(dict.get("x"), None);
        assert!(dict.is_empty());
        dict.intern("x").unwrap();
        assert_eq!(dict.get("x"), Some(0));
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut dict = SymbolDictionary::new();
        for s in ["c", "a", "b"] {
            dict.intern(s).unwrap();
        }
        let pairs: Vec<_> = dict.iter().collect();
        assert_eq!(pairs, vec![(0, "c"), (1, "a"), (2, "b")]);
    }

    #[test]
    fn test_vocabularies_are_independent() {
        let mut vocab = Vocabularies::new();
        assert_eq!(vocab.tokens.intern("root").unwrap(), 0);
        assert_eq!(vocab.relations.intern("nsubj").unwrap(), 0);
        assert_eq!(vocab.relations.intern("root").unwrap(), 1);
        assert_eq!(vocab.tags.intern("POS").unwrap(), 0);

        assert_eq!(
            vocab.sizes(),
            VocabSizes {
                tokens: 1,
                tags: 1,
                relations: 2
            }
        );
    }

    #[test]
    fn test_freeze_for_evaluation() {
        let mut vocab = Vocabularies::new();
        vocab.tokens.intern("dog").unwrap();
        vocab.tags.intern("POS").unwrap();
        vocab.relations.intern("nsubj").unwrap();

        vocab.freeze_for_evaluation("UNK").unwrap();
        assert_eq!(vocab.sizes().tokens, 2);

        let unk = vocab.tokens.get("UNK").unwrap();
        assert_eq!(vocab.tokens.intern("cat").unwrap(), unk);
        assert!(matches!(
            vocab.tags.intern("NEG"),
            Err(DictError::UnknownSymbol(_))
        ));
        assert!(matches!(
            vocab.relations.intern("obj"),
            Err(DictError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DictError>();
    }
}
