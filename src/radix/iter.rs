// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Forward and reverse trie iterators with bound and prefix seeks.
//!
//! Iterators hold `Arc` references into an immutable node graph, so they
//! stay valid (and stable) no matter what later commits do to the tree
//! they were created from.

use std::sync::Arc;

use crate::watch::WatchHandle;

use super::node::{common_prefix_len, Node};

enum Frame<V> {
    Node(Arc<Node<V>>),
    Leaf(Vec<u8>, V),
}

/// Ascending iterator over `(key, value)` pairs.
pub struct Iter<V> {
    stack: Vec<Frame<V>>,
    watch: WatchHandle,
}

impl<V: Clone> Iterator for Iter<V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Leaf(key, value) => return Some((key, value)),
                Frame::Node(n) => {
                    // Children pushed high-to-low so low labels pop first;
                    // the node's own leaf is the smallest key in the
                    // subtree and pops before any child.
                    for (_, child) in n.edges.iter().rev() {
                        self.stack.push(Frame::Node(child.clone()));
                    }
                    if let Some(leaf) = &n.leaf {
                        self.stack.push(Frame::Leaf(leaf.key.clone(), leaf.value.clone()));
                    }
                }
            }
        }
        None
    }
}

impl<V> Iter<V> {
    /// Notifier of the deepest node the seek observed; fires when anything
    /// in the iterated range changes in a later published root.
    pub fn watch(&self) -> WatchHandle {
        self.watch.clone()
    }
}

/// Descending iterator over `(key, value)` pairs.
pub struct RevIter<V> {
    stack: Vec<Frame<V>>,
    watch: WatchHandle,
}

impl<V: Clone> Iterator for RevIter<V> {
    type Item = (Vec<u8>, V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Leaf(key, value) => return Some((key, value)),
                Frame::Node(n) => {
                    // Mirror image of the ascending expansion.
                    if let Some(leaf) = &n.leaf {
                        self.stack.push(Frame::Leaf(leaf.key.clone(), leaf.value.clone()));
                    }
                    for (_, child) in n.edges.iter() {
                        self.stack.push(Frame::Node(child.clone()));
                    }
                }
            }
        }
        None
    }
}

impl<V> RevIter<V> {
    pub fn watch(&self) -> WatchHandle {
        self.watch.clone()
    }
}

/// Full ascending iteration from the smallest key.
pub(crate) fn iter_all<V>(root: &Arc<Node<V>>) -> Iter<V> {
    Iter {
        stack: vec![Frame::Node(root.clone())],
        watch: WatchHandle::new(root.notify.clone()),
    }
}

/// Full descending iteration from the largest key.
pub(crate) fn rev_iter_all<V>(root: &Arc<Node<V>>) -> RevIter<V> {
    RevIter {
        stack: vec![Frame::Node(root.clone())],
        watch: WatchHandle::new(root.notify.clone()),
    }
}

/// Ascending iteration over keys `>= bound`.
pub(crate) fn iter_from<V>(root: &Arc<Node<V>>, bound: &[u8]) -> Iter<V> {
    let mut stack = Vec::new();
    let mut node = root.clone();
    let mut watch = WatchHandle::new(root.notify.clone());
    let mut search = bound;

    loop {
        let common = common_prefix_len(&node.prefix, search);
        if common == search.len() {
            // The whole subtree extends the bound, so all of it qualifies.
            stack.push(Frame::Node(node));
            break;
        }
        if common == node.prefix.len() {
            // Prefix consumed; the node's own leaf is a strict prefix of
            // the bound and is excluded. Split the edges around the next
            // search byte.
            let b = search[common];
            let idx = node.edges.partition_point(|(l, _)| *l < b);
            for (label, child) in node.edges[idx..].iter().rev() {
                if *label > b {
                    stack.push(Frame::Node(child.clone()));
                }
            }
            match node.get_edge(b) {
                Some(child) => {
                    let child = child.clone();
                    watch = WatchHandle::new(child.notify.clone());
                    search = &search[common..];
                    node = child;
                }
                None => break,
            }
        } else {
            // Diverged inside the compressed path.
            if node.prefix[common] > search[common] {
                stack.push(Frame::Node(node));
            }
            break;
        }
    }

    Iter { stack, watch }
}

/// Descending iteration over keys `<= bound`.
pub(crate) fn rev_iter_from<V: Clone>(root: &Arc<Node<V>>, bound: &[u8]) -> RevIter<V> {
    let mut stack = Vec::new();
    let mut node = root.clone();
    let mut watch = WatchHandle::new(root.notify.clone());
    let mut search = bound;

    loop {
        let common = common_prefix_len(&node.prefix, search);
        if common == search.len() {
            // Keys below this node all extend the bound. Only an exact
            // match (leaf at a fully consumed prefix) is `<=` it.
            if common == node.prefix.len() {
                if let Some(leaf) = &node.leaf {
                    stack.push(Frame::Leaf(leaf.key.clone(), leaf.value.clone()));
                }
            }
            break;
        }
        if common == node.prefix.len() {
            // The node's own leaf is a strict prefix of the bound and thus
            // smaller; push it first so it pops last.
            if let Some(leaf) = &node.leaf {
                stack.push(Frame::Leaf(leaf.key.clone(), leaf.value.clone()));
            }
            let b = search[common];
            let idx = node.edges.partition_point(|(l, _)| *l < b);
            for (_, child) in node.edges[..idx].iter() {
                stack.push(Frame::Node(child.clone()));
            }
            match node.get_edge(b) {
                Some(child) => {
                    let child = child.clone();
                    watch = WatchHandle::new(child.notify.clone());
                    search = &search[common..];
                    node = child;
                }
                None => break,
            }
        } else {
            if node.prefix[common] < search[common] {
                stack.push(Frame::Node(node));
            }
            break;
        }
    }

    RevIter { stack, watch }
}

/// Locates the subtree covering `prefix`, returning it (if any) and the
/// notifier of the deepest node observed during the descent.
fn seek_prefix<V>(root: &Arc<Node<V>>, prefix: &[u8]) -> (Option<Arc<Node<V>>>, WatchHandle) {
    let mut node = root.clone();
    let mut watch = WatchHandle::new(root.notify.clone());
    let mut search = prefix;

    loop {
        let common = common_prefix_len(&node.prefix, search);
        if common == search.len() {
            return (Some(node), watch);
        }
        if common == node.prefix.len() {
            match node.get_edge(search[common]) {
                Some(child) => {
                    let child = child.clone();
                    watch = WatchHandle::new(child.notify.clone());
                    search = &search[common..];
                    node = child;
                }
                None => return (None, watch),
            }
        } else {
            return (None, WatchHandle::new(node.notify.clone()));
        }
    }
}

/// Ascending iteration over keys sharing `prefix`.
pub(crate) fn iter_prefix<V>(root: &Arc<Node<V>>, prefix: &[u8]) -> Iter<V> {
    let (subtree, watch) = seek_prefix(root, prefix);
    let stack = subtree.map(Frame::Node).into_iter().collect();
    Iter { stack, watch }
}

/// Descending iteration over keys sharing `prefix`.
pub(crate) fn rev_iter_prefix<V>(root: &Arc<Node<V>>, prefix: &[u8]) -> RevIter<V> {
    let (subtree, watch) = seek_prefix(root, prefix);
    let stack = subtree.map(Frame::Node).into_iter().collect();
    RevIter { stack, watch }
}
