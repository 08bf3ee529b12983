//! Python bindings for sentitree
//!
//! This module provides PyO3-based Python bindings so a Python numeric
//! library can consume the trees and dictionary sizes directly.

use pyo3::exceptions::{PyIOError, PyIndexError, PyKeyError, PyValueError};
use pyo3::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

use crate::dictionary::{DictError, SymbolDictionary, Vocabularies};
use crate::tree::{DepTree, NodeId};
use crate::treebank::{CorpusError, FieldDelimiter, ReaderConfig, read_treebank_with_config};

/// Convert CorpusError to Python exception
impl From<CorpusError> for PyErr {
    fn from(err: CorpusError) -> PyErr {
        match &err {
            CorpusError::Io(_) | CorpusError::FileOpen { .. } => PyIOError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Convert DictError to Python exception
impl From<DictError> for PyErr {
    fn from(err: DictError) -> PyErr {
        match &err {
            DictError::UnknownSymbol(_) => PyKeyError::new_err(err.to_string()),
            DictError::InvalidId { .. } => PyIndexError::new_err(err.to_string()),
            DictError::Exhausted => PyValueError::new_err(err.to_string()),
        }
    }
}

#[pyclass(name = "Tree")]
#[derive(Clone)]
pub struct PyTree {
    pub(crate) inner: Arc<DepTree>,
}

#[pymethods]
impl PyTree {
    fn __len__(&self) -> usize {
        self.inner.len()
    }

    #[getter]
    fn root(&self) -> NodeId {
        self.inner.root()
    }

    /// Parent ids, indexed by node - 1
    #[getter]
    fn parents(&self) -> Vec<NodeId> {
        self.inner.parents().to_vec()
    }

    #[getter]
    fn relations(&self) -> Vec<usize> {
        self.inner.relations().to_vec()
    }

    #[getter]
    fn tokens(&self) -> Vec<usize> {
        self.inner.tokens().to_vec()
    }

    #[getter]
    fn leaves(&self) -> Vec<NodeId> {
        self.inner.leaves().to_vec()
    }

    /// Post-order node ids, ending with the root marker 0
    #[getter]
    fn linearization(&self) -> Vec<NodeId> {
        self.inner.linearization().to_vec()
    }

    fn parent(&self, node: NodeId) -> PyResult<NodeId> {
        self.inner
            .parent(node)
            .ok_or_else(|| PyIndexError::new_err(format!("node out of range: {}", node)))
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.children(node).to_vec()
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.inner.is_leaf(node)
    }

    fn __repr__(&self) -> String {
        format!(
            "<Tree with {} nodes, root {}>",
            self.inner.len(),
            self.inner.root()
        )
    }
}

#[pyclass(name = "Example")]
pub struct PyExample {
    tree: PyTree,
    label: usize,
}

#[pymethods]
impl PyExample {
    #[getter]
    fn tree(&self) -> PyTree {
        self.tree.clone()
    }

    #[getter]
    fn label(&self) -> usize {
        self.label
    }

    fn __repr__(&self) -> String {
        format!(
            "<Example label={} nodes={}>",
            self.label,
            self.tree.inner.len()
        )
    }
}

/// Token, tag and relation dictionaries shared across reads
#[pyclass(name = "Vocabularies", unsendable)]
pub struct PyVocabularies {
    inner: Vocabularies,
}

#[pymethods]
impl PyVocabularies {
    #[new]
    fn new() -> Self {
        Self {
            inner: Vocabularies::new(),
        }
    }

    /// Read a treebank file, interning into these dictionaries
    #[pyo3(signature = (path, delimiter = "tab"))]
    fn read(&mut self, path: PathBuf, delimiter: &str) -> PyResult<Vec<PyExample>> {
        let delimiter = match delimiter {
            "tab" => FieldDelimiter::Tab,
            "whitespace" => FieldDelimiter::Whitespace,
            other => {
                return Err(PyValueError::new_err(format!(
                    "delimiter must be 'tab' or 'whitespace', not {:?}",
                    other
                )));
            }
        };
        let dataset = read_treebank_with_config(path, &mut self.inner, ReaderConfig { delimiter })?;
        Ok(dataset
            .into_iter()
            .map(|example| PyExample {
                tree: PyTree {
                    inner: Arc::new(example.tree),
                },
                label: example.label,
            })
            .collect())
    }

    #[pyo3(signature = (unknown = "UNK"))]
    fn freeze_for_evaluation(&mut self, unknown: &str) -> PyResult<()> {
        Ok(self.inner.freeze_for_evaluation(unknown)?)
    }

    /// (tokens, tags, relations) dictionary sizes
    fn sizes(&self) -> (usize, usize, usize) {
        let sizes = self.inner.sizes();
        (sizes.tokens, sizes.tags, sizes.relations)
    }

    fn token(&self, id: usize) -> PyResult<String> {
        lookup(&self.inner.tokens, id)
    }

    fn tag(&self, id: usize) -> PyResult<String> {
        lookup(&self.inner.tags, id)
    }

    fn relation(&self, id: usize) -> PyResult<String> {
        lookup(&self.inner.relations, id)
    }

    /// Human-readable dump of a tree
    fn dump(&self, tree: PyRef<'_, PyTree>) -> String {
        tree.inner.display(&self.inner).to_string()
    }
}

fn lookup(dict: &SymbolDictionary, id: usize) -> PyResult<String> {
    Ok(dict.lookup(id)?.to_string())
}

#[pymodule]
fn sentitree(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyTree>()?;
    m.add_class::<PyExample>()?;
    m.add_class::<PyVocabularies>()?;
    Ok(())
}
