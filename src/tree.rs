//! Dependency tree built from parent-pointer arrays
//!
//! Nodes are dense integer ids `1..=N` in sentence order. Id `0` is the
//! synthetic root marker: the sentence root is the one node whose parent
//! is `0`. Child lists are stored as ranges into a single flat array, so a
//! tree is a handful of `Vec`s with no references between nodes.

use crate::dictionary::{SymbolId, Vocabularies};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a node (1-based; `0` is the synthetic root)
pub type NodeId = usize;

/// The synthetic root marker
pub const ROOT: NodeId = 0;

/// Reasons a parent array does not describe a rooted tree
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("no node is attached to the root")]
    NoRoot,

    #[error("nodes {first} and {second} are both attached to the root")]
    MultipleRoots { first: NodeId, second: NodeId },

    #[error("node {node} has parent {parent}, outside 0..={len}")]
    ParentOutOfRange {
        node: NodeId,
        parent: NodeId,
        len: usize,
    },

    #[error("node {node} is on a cycle and cannot be reached from the root")]
    Cycle { node: NodeId },

    #[error(
        "array lengths differ: {parents} parents, {relations} relations, {tokens} tokens"
    )]
    LengthMismatch {
        parents: usize,
        relations: usize,
        tokens: usize,
    },
}

/// An immutable dependency tree (sentence)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepTree {
    /// `parents[i - 1]` is the parent of node `i`
    parents: Vec<NodeId>,
    relations: Vec<SymbolId>,
    tokens: Vec<SymbolId>,
    /// Sentence root (the node whose parent is `ROOT`)
    root: NodeId,
    /// Children of node `p` are `child_ids[child_offsets[p]..child_offsets[p + 1]]`
    child_offsets: Vec<usize>,
    child_ids: Vec<NodeId>,
    /// Sorted leaf ids
    leaves: Vec<NodeId>,
    /// Post-order emission, `ROOT` last
    dfo: Vec<NodeId>,
}

impl DepTree {
    /// Build a tree from parallel per-node arrays.
    ///
    /// Index `i` of each array describes node `i + 1`. Parent values are
    /// node ids, with `ROOT` marking the sentence root.
    pub fn new(
        parents: Vec<NodeId>,
        relations: Vec<SymbolId>,
        tokens: Vec<SymbolId>,
    ) -> Result<Self, TreeError> {
        let n = parents.len();
        if relations.len() != n || tokens.len() != n {
            return Err(TreeError::LengthMismatch {
                parents: n,
                relations: relations.len(),
                tokens: tokens.len(),
            });
        }

        let mut root = None;
        for (i, &parent) in parents.iter().enumerate() {
            let node = i + 1;
            if parent > n {
                return Err(TreeError::ParentOutOfRange {
                    node,
                    parent,
                    len: n,
                });
            }
            if parent == ROOT {
                if let Some(first) = root {
                    return Err(TreeError::MultipleRoots {
                        first,
                        second: node,
                    });
                }
                root = Some(node);
            }
        }
        let root = root.ok_or(TreeError::NoRoot)?;

        let (child_offsets, child_ids) = build_children(&parents);

        // A node is a leaf iff nobody names it as parent
        let leaves = (1..=n)
            .filter(|&node| child_offsets[node] == child_offsets[node + 1])
            .collect();

        let dfo = depth_first_order(&child_offsets, &child_ids, n);
        if dfo.len() != n + 1 {
            let mut seen = vec![false; n + 1];
            for &node in &dfo {
                seen[node] = true;
            }
            let node = (1..=n).find(|&node| !seen[node]).unwrap_or(root);
            return Err(TreeError::Cycle { node });
        }

        Ok(Self {
            parents,
            relations,
            tokens,
            root,
            child_offsets,
            child_ids,
            leaves,
            dfo,
        })
    }

    /// Number of real nodes (excludes `ROOT`)
    #[inline]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Always false: a valid tree has a root node
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// The sentence root
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Parent of `node`, `Some(ROOT)` for the sentence root, `None` out of range
    #[inline]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slot(node).map(|i| self.parents[i])
    }

    #[inline]
    pub fn relation(&self, node: NodeId) -> Option<SymbolId> {
        self.slot(node).map(|i| self.relations[i])
    }

    #[inline]
    pub fn token(&self, node: NodeId) -> Option<SymbolId> {
        self.slot(node).map(|i| self.tokens[i])
    }

    /// Children of `node` in sentence order.
    ///
    /// `children(ROOT)` holds only the sentence root. Leaves and
    /// out-of-range ids give an empty slice.
    #[inline]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        if node > self.len() {
            return &[];
        }
        &self.child_ids[self.child_offsets[node]..self.child_offsets[node + 1]]
    }

    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        node != ROOT && node <= self.len() && self.children(node).is_empty()
    }

    /// Leaf ids in ascending order
    #[inline]
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Depth-first post-order over all nodes, ending with the `ROOT` marker.
    ///
    /// Every node follows all of its descendants, and siblings appear left
    /// to right. The slice has `len() + 1` entries.
    #[inline]
    pub fn linearization(&self) -> &[NodeId] {
        &self.dfo
    }

    /// The linearization without the trailing `ROOT` marker
    #[inline]
    pub fn node_order(&self) -> &[NodeId] {
        &self.dfo[..self.len()]
    }

    /// Parent ids, indexed by `node - 1`
    #[inline]
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Relation ids, indexed by `node - 1`
    #[inline]
    pub fn relations(&self) -> &[SymbolId] {
        &self.relations
    }

    /// Token ids, indexed by `node - 1`
    #[inline]
    pub fn tokens(&self) -> &[SymbolId] {
        &self.tokens
    }

    /// Render the tree through `vocab` for diagnostics
    pub fn display<'a>(&'a self, vocab: &'a Vocabularies) -> TreeDisplay<'a> {
        TreeDisplay { tree: self, vocab }
    }

    #[inline]
    fn slot(&self, node: NodeId) -> Option<usize> {
        (node != ROOT && node <= self.len()).then(|| node - 1)
    }
}

/// Group nodes by parent into a CSR layout.
///
/// Nodes are placed in ascending order, so each child list keeps sentence order.
fn build_children(parents: &[NodeId]) -> (Vec<usize>, Vec<NodeId>) {
    let n = parents.len();
    let mut offsets = vec![0usize; n + 2];
    for &parent in parents {
        offsets[parent + 1] += 1;
    }
    for p in 0..=n {
        offsets[p + 1] += offsets[p];
    }

    let mut next = offsets.clone();
    let mut ids = vec![ROOT; n];
    for (i, &parent) in parents.iter().enumerate() {
        ids[next[parent]] = i + 1;
        next[parent] += 1;
    }
    (offsets, ids)
}

/// Iterative post-order walk from `ROOT`.
///
/// A node with unexpanded children pushes them in reverse so they pop left
/// to right. Anything else (a leaf, or a node whose children are done) is
/// emitted and popped. Nodes on a cycle are never reached.
fn depth_first_order(offsets: &[usize], ids: &[NodeId], n: usize) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(n + 1);
    let mut expanded = vec![false; n + 1];
    let mut stack = vec![ROOT];

    while let Some(&top) = stack.last() {
        let children = &ids[offsets[top]..offsets[top + 1]];
        if !children.is_empty() && !expanded[top] {
            expanded[top] = true;
            stack.extend(children.iter().rev());
        } else {
            order.push(top);
            stack.pop();
        }
    }
    order
}

/// Human-readable dump of a tree; see [`DepTree::display`]
pub struct TreeDisplay<'a> {
    tree: &'a DepTree,
    vocab: &'a Vocabularies,
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree;
        let words: Vec<&str> = tree
            .tokens()
            .iter()
            .map(|&id| self.vocab.tokens.lookup(id).unwrap_or("?"))
            .collect();
        writeln!(f, "Tree for sentence \"{}\"", words.join(" "))?;

        for (i, (&parent, &rel)) in tree.parents().iter().zip(tree.relations()).enumerate() {
            let rel = self.vocab.relations.lookup(rel).unwrap_or("?");
            writeln!(f, "{}<-{}-{}", i + 1, rel, parent)?;
        }

        write!(f, "Leaves:")?;
        for leaf in tree.leaves() {
            write!(f, " {}", leaf)?;
        }
        writeln!(f)?;

        let order: Vec<String> = tree
            .linearization()
            .iter()
            .map(|&node| {
                if node == ROOT {
                    "ROOT".to_string()
                } else {
                    node.to_string()
                }
            })
            .collect();
        writeln!(f, "Depth-first order: {}", order.join("->"))
    }
}
