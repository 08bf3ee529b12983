//! Sentitree: dependency treebanks for tree-structured sentiment models
//!
//! Reads parent-pointer treebanks into immutable dependency trees with a
//! deterministic depth-first order, and maintains the token, tag and
//! relation dictionaries that give a numeric model its dense ids.
//! Core implementation in Rust with Python bindings.

pub mod bytes; // Field splitting and number parsing on raw lines
pub mod dictionary; // Symbol dictionaries with freeze/unknown lifecycle
pub mod tree; // Dependency tree, leaves and linearization
pub mod treebank; // Treebank file reading

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

// Re-exports for convenience
pub use dictionary::{DictError, SymbolDictionary, SymbolId, VocabSizes, Vocabularies};
pub use tree::{DepTree, NodeId, ROOT, TreeDisplay, TreeError};
pub use treebank::{
    CorpusError, CorpusStats, Dataset, Example, FieldDelimiter, ReaderConfig, TreebankReader,
    read_treebank, read_treebank_with_config,
};
