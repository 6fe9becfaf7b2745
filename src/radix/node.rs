// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Trie node and leaf representation plus the shared read walks.

use std::sync::Arc;

use crate::watch::{Notify, WatchHandle};

/// A stored entry: the full key and its value.
pub(crate) struct Leaf<V> {
    pub(crate) key: Vec<u8>,
    pub(crate) value: V,
    pub(crate) notify: Arc<Notify>,
}

/// An interior trie node.
///
/// `prefix` is the compressed path below the parent edge; for non-root
/// nodes its first byte equals the edge label. `edges` is kept sorted by
/// label so iteration order is lexicographic on the raw key bytes.
pub(crate) struct Node<V> {
    pub(crate) prefix: Vec<u8>,
    pub(crate) leaf: Option<Arc<Leaf<V>>>,
    pub(crate) edges: Vec<(u8, Arc<Node<V>>)>,
    pub(crate) notify: Arc<Notify>,
}

impl<V> Node<V> {
    pub(crate) fn new(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            leaf: None,
            edges: Vec::new(),
            notify: Notify::new(),
        }
    }

    /// Binary search for an edge label: `Ok(idx)` when present, `Err(idx)`
    /// with the insertion point otherwise.
    pub(crate) fn edge_index(&self, label: u8) -> Result<usize, usize> {
        self.edges.binary_search_by_key(&label, |(l, _)| *l)
    }

    pub(crate) fn get_edge(&self, label: u8) -> Option<&Arc<Node<V>>> {
        self.edge_index(label).ok().map(|idx| &self.edges[idx].1)
    }

    pub(crate) fn add_edge(&mut self, label: u8, node: Arc<Node<V>>) {
        match self.edge_index(label) {
            Ok(idx) => self.edges[idx] = (label, node),
            Err(idx) => self.edges.insert(idx, (label, node)),
        }
    }
}

/// Length of the longest common prefix of two byte strings.
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Point lookup against a node graph.
pub(crate) fn get<'a, V>(root: &'a Node<V>, key: &[u8]) -> Option<&'a V> {
    let mut n = root;
    let mut search = key;
    loop {
        if search.is_empty() {
            return n.leaf.as_ref().map(|leaf| &leaf.value);
        }
        match n.get_edge(search[0]) {
            Some(child) if search.starts_with(&child.prefix) => {
                search = &search[child.prefix.len()..];
                n = child;
            }
            _ => return None,
        }
    }
}

/// Point lookup that also reports the notifier of the deepest observed
/// node: the leaf itself on a hit, the node where the walk diverged on a
/// miss. The returned handle fires once anything relevant to `key` changes
/// in a later published root.
pub(crate) fn get_watch<'a, V>(root: &'a Node<V>, key: &[u8]) -> (Option<&'a V>, WatchHandle) {
    let mut n = root;
    let mut search = key;
    loop {
        if search.is_empty() {
            return match &n.leaf {
                Some(leaf) => (Some(&leaf.value), WatchHandle::new(leaf.notify.clone())),
                None => (None, WatchHandle::new(n.notify.clone())),
            };
        }
        match n.get_edge(search[0]) {
            Some(child) => {
                if search.starts_with(&child.prefix) {
                    search = &search[child.prefix.len()..];
                    n = child;
                } else {
                    // Diverged inside the child's compressed path; a key
                    // under `child` could later match, so watch it.
                    return (None, WatchHandle::new(child.notify.clone()));
                }
            }
            None => return (None, WatchHandle::new(n.notify.clone())),
        }
    }
}

/// Longest-prefix match: the entry at the deepest ancestor whose full key
/// is a byte-prefix of `key`.
pub(crate) fn longest_prefix<'a, V>(root: &'a Node<V>, key: &[u8]) -> Option<(&'a [u8], &'a V)> {
    let mut last: Option<&Arc<Leaf<V>>> = None;
    let mut n = root;
    let mut search = key;
    loop {
        if let Some(leaf) = &n.leaf {
            last = Some(leaf);
        }
        if search.is_empty() {
            break;
        }
        match n.get_edge(search[0]) {
            Some(child) if search.starts_with(&child.prefix) => {
                search = &search[child.prefix.len()..];
                n = child;
            }
            _ => break,
        }
    }
    last.map(|leaf| (leaf.key.as_slice(), &leaf.value))
}
