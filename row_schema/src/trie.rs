//! Prefix tree over requested field paths.

use std::fmt;

use indexmap::IndexMap;

use crate::{FieldPath, PathStep};

/// Merges requested [`FieldPath`]s into a minimal prefix tree.
///
/// Nodes correspond to row-type fields and are keyed by field position. A
/// leaf marks "the whole subtree at this point is needed"; a leaf node never
/// has children, so the set of leaves read left-to-right is the minimal,
/// duplicate-free cover of everything requested.
///
/// Merge rules:
///
/// - inserting a path that runs into an existing leaf is a no-op (the leaf
///   already covers it),
/// - inserting a path that is *shorter* than previously recorded paths under
///   the same prefix turns that prefix into a leaf and drops the now
///   redundant children (broader selection subsumes narrower),
/// - any array/map access marks a leaf at the container itself: element
///   structure is never projected through a container, so both constant and
///   dynamic index steps pin the whole container,
/// - children stay in first-seen order, which fixes the column order of the
///   reduced schema.
#[derive(Debug, Default)]
pub struct PathTrie {
    children: IndexMap<usize, TrieNode>,
}

/// A node of the [`PathTrie`], one row-type field.
#[derive(Debug, Default)]
pub struct TrieNode {
    leaf: bool,
    children: IndexMap<usize, TrieNode>,
}

impl TrieNode {
    /// Whether the whole field (its full original type) is needed.
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Retained sub-fields, in first-seen order. Empty for leaves.
    pub fn children(&self) -> impl Iterator<Item = (usize, &Self)> {
        self.children.iter().map(|(index, node)| (*index, node))
    }

    fn mark_leaf(&mut self) {
        self.leaf = true;
        self.children.clear();
    }

    fn fmt_children(
        children: &IndexMap<usize, Self>,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, (index, node)) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{index}")?;
            if !node.leaf {
                write!(f, "{{")?;
                Self::fmt_children(&node.children, f)?;
                write!(f, "}}")?;
            }
        }
        Ok(())
    }
}

impl PathTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trie from paths in order.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a FieldPath>) -> Self {
        let mut trie = Self::new();
        for path in paths {
            trie.insert(path);
        }
        trie
    }

    /// Merge one path into the trie.
    pub fn insert(&mut self, path: &FieldPath) {
        let mut steps = path.steps().iter();
        let Some(PathStep::Field(root)) = steps.next() else {
            unreachable!("paths start with a root field step");
        };
        let mut node = self.children.entry(*root).or_default();
        for step in steps {
            if node.leaf {
                // already covered by a broader selection
                return;
            }
            match step {
                PathStep::Field(index) => {
                    node = node.children.entry(*index).or_default();
                }
                _ => {
                    // container access pins the whole container
                    node.mark_leaf();
                    return;
                }
            }
        }
        node.mark_leaf();
    }

    /// Whether no paths were recorded.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Top-level entries in first-seen order.
    pub fn top_level(&self) -> impl Iterator<Item = (usize, &TrieNode)> {
        self.children.iter().map(|(index, node)| (*index, node))
    }

    /// Collapse every top-level entry to a leaf.
    ///
    /// Used when the source only supports top-level projection pushdown:
    /// any deeper requirement widens to "whole field needed".
    pub fn collapse_to_top_level(&mut self) {
        for node in self.children.values_mut() {
            node.mark_leaf();
        }
    }

    /// All leaf positions as field-index paths, left-to-right.
    pub fn leaf_paths(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        collect_leaves(&self.children, &mut prefix, &mut out);
        out
    }
}

fn collect_leaves(
    children: &IndexMap<usize, TrieNode>,
    prefix: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    for (index, node) in children {
        prefix.push(*index);
        if node.leaf {
            out.push(prefix.clone());
        } else {
            collect_leaves(&node.children, prefix, out);
        }
        prefix.pop();
    }
}

impl fmt::Display for PathTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TrieNode::fmt_children(&self.children, f)
    }
}
