// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Persistent radix trie with structural sharing and change notification.
//!
//! This is the index primitive underneath every table index: an immutable
//! byte-keyed ordered map. Mutation goes through a [`TreeTxn`] that
//! path-copies from the root to each edited node and produces a new
//! [`Tree`] on commit; untouched nodes are aliased between the old and new
//! roots, which is what makes snapshots free and commits atomic.
//!
//! # Key Concepts
//!
//! Every node and leaf owns a one-shot notifier. When a commit supersedes
//! a node, the old node's notifier is closed at publish time, waking any
//! watcher that observed that part of the tree through
//! [`Tree::get_watch`] or an iterator's watch handle.
//!
//! # Example
//!
//! ```
//! use iridiumdb::radix::Tree;
//!
//! let tree: Tree<u32> = Tree::new();
//! let (tree, _) = tree.insert(b"foo", 1);
//! let (tree, prev) = tree.insert(b"foo", 2);
//! assert_eq!(prev, Some(1));
//! assert_eq!(tree.get(b"foo"), Some(&2));
//! ```

mod iter;
mod node;

pub use iter::{Iter, RevIter};

use std::collections::HashSet;
use std::sync::Arc;

use crate::watch::{Notify, WatchHandle};

use node::{common_prefix_len, Leaf, Node};

/// An immutable radix tree root. Cloning is O(1) and shares all nodes.
pub struct Tree<V> {
    root: Arc<Node<V>>,
    size: usize,
}

impl<V> Clone for Tree<V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            size: self.size,
        }
    }
}

impl<V> Default for Tree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Tree<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            root: Arc::new(Node::new(Vec::new())),
            size: 0,
        }
    }

    /// Returns the number of stored entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the tree holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Looks up the value stored at `key`.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        node::get(&self.root, key)
    }

    /// Looks up `key` and returns the watch handle of the deepest node
    /// observed, which fires once a later commit changes anything relevant
    /// to this key.
    pub fn get_watch(&self, key: &[u8]) -> (Option<&V>, WatchHandle) {
        node::get_watch(&self.root, key)
    }

    /// Returns the entry with the longest key that is a byte-prefix of
    /// `key`.
    pub fn longest_prefix(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        node::longest_prefix(&self.root, key)
    }

    /// Ascending iteration over all entries.
    pub fn iter(&self) -> Iter<V> {
        iter::iter_all(&self.root)
    }

    /// Ascending iteration over entries with keys `>= bound`.
    pub fn iter_from(&self, bound: &[u8]) -> Iter<V> {
        iter::iter_from(&self.root, bound)
    }

    /// Descending iteration over all entries.
    pub fn rev_iter(&self) -> RevIter<V> {
        iter::rev_iter_all(&self.root)
    }

    /// Ascending iteration over entries whose keys start with `prefix`.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Iter<V> {
        iter::iter_prefix(&self.root, prefix)
    }

    /// Descending iteration over entries whose keys start with `prefix`.
    pub fn rev_iter_prefix(&self, prefix: &[u8]) -> RevIter<V> {
        iter::rev_iter_prefix(&self.root, prefix)
    }
}

impl<V: Clone> Tree<V> {
    /// Descending iteration over entries with keys `<= bound`.
    pub fn rev_iter_from(&self, bound: &[u8]) -> RevIter<V> {
        iter::rev_iter_from(&self.root, bound)
    }

    /// Starts a transaction on top of this root.
    pub fn txn(&self) -> TreeTxn<V> {
        TreeTxn::new(self)
    }

    /// Inserts in a one-off transaction, publishing immediately.
    ///
    /// Returns the new root and the previous value, if any.
    pub fn insert(&self, key: &[u8], value: V) -> (Tree<V>, Option<V>) {
        let mut txn = self.txn();
        let old = txn.insert(key, value);
        (txn.commit(), old)
    }

    /// Deletes in a one-off transaction, publishing immediately.
    pub fn delete(&self, key: &[u8]) -> (Tree<V>, Option<V>) {
        let mut txn = self.txn();
        let old = txn.delete(key);
        (txn.commit(), old)
    }
}

/// A transaction over a [`Tree`]: accumulates mutations by path-copy and
/// yields a new root on commit.
///
/// Reads against the transaction observe its staged state. The set of
/// notifiers superseded by the staged mutations is carried until commit so
/// the embedder can close them after the new root is published.
pub struct TreeTxn<V> {
    root: Arc<Node<V>>,
    size: usize,
    pending: Vec<Arc<Notify>>,
    tracked: HashSet<usize>,
}

impl<V: Clone> TreeTxn<V> {
    pub fn new(tree: &Tree<V>) -> Self {
        Self {
            root: tree.root.clone(),
            size: tree.size,
            pending: Vec::new(),
            tracked: HashSet::new(),
        }
    }

    /// Number of entries in the staged state.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns true if the staged state holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Looks up `key` in the staged state.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        node::get(&self.root, key)
    }

    /// A read-only snapshot of the staged state. O(1); later mutations of
    /// this transaction do not affect it.
    pub fn snapshot(&self) -> Tree<V> {
        Tree {
            root: self.root.clone(),
            size: self.size,
        }
    }

    /// Finalizes the transaction, closing superseded notifiers immediately.
    pub fn commit(self) -> Tree<V> {
        let (tree, pending) = self.finish();
        for notify in pending {
            notify.close();
        }
        tree
    }

    /// Finalizes the transaction without notifying. The caller publishes
    /// the returned root, then closes the returned notifiers.
    pub(crate) fn finish(self) -> (Tree<V>, Vec<Arc<Notify>>) {
        (
            Tree {
                root: self.root,
                size: self.size,
            },
            self.pending,
        )
    }

    /// Inserts `value` at `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let root = self.root.clone();
        let (new_root, old) = self.insert_rec(&root, key, key, value);
        self.root = new_root;
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    /// Deletes the entry at `key`, returning its value if it existed.
    pub fn delete(&mut self, key: &[u8]) -> Option<V> {
        let root = self.root.clone();
        let (new_root, leaf) = self.delete_rec(&root, key, true)?;
        self.root = Arc::new(new_root);
        self.size -= 1;
        Some(leaf.value.clone())
    }

    fn record(&mut self, notify: &Arc<Notify>) {
        if self.tracked.insert(Arc::as_ptr(notify) as usize) {
            self.pending.push(notify.clone());
        }
    }

    /// Clones a node for mutation, recording the superseded notifier.
    fn write_node(&mut self, n: &Node<V>) -> Node<V> {
        self.record(&n.notify);
        Node {
            prefix: n.prefix.clone(),
            leaf: n.leaf.clone(),
            edges: n.edges.clone(),
            notify: Notify::new(),
        }
    }

    fn new_leaf(key: &[u8], value: V) -> Arc<Leaf<V>> {
        Arc::new(Leaf {
            key: key.to_vec(),
            value,
            notify: Notify::new(),
        })
    }

    fn insert_rec(
        &mut self,
        n: &Arc<Node<V>>,
        key: &[u8],
        search: &[u8],
        value: V,
    ) -> (Arc<Node<V>>, Option<V>) {
        // Key exhausted: this node carries the leaf.
        if search.is_empty() {
            let mut nc = self.write_node(n);
            let old = match &n.leaf {
                Some(leaf) => {
                    self.record(&leaf.notify);
                    Some(leaf.value.clone())
                }
                None => None,
            };
            nc.leaf = Some(Self::new_leaf(key, value));
            return (Arc::new(nc), old);
        }

        let idx = match n.edge_index(search[0]) {
            Ok(idx) => idx,
            Err(_) => {
                // No edge: hang the remaining search off a new child.
                let mut child = Node::new(search.to_vec());
                child.leaf = Some(Self::new_leaf(key, value));
                let mut nc = self.write_node(n);
                nc.add_edge(search[0], Arc::new(child));
                return (Arc::new(nc), None);
            }
        };

        let child = n.edges[idx].1.clone();
        let common = common_prefix_len(search, &child.prefix);
        if common == child.prefix.len() {
            let (new_child, old) = self.insert_rec(&child, key, &search[common..], value);
            let mut nc = self.write_node(n);
            nc.edges[idx].1 = new_child;
            return (Arc::new(nc), old);
        }

        // Compressed path diverges: split the child edge.
        let mut split = Node::new(search[..common].to_vec());
        let mut moved = self.write_node(&child);
        moved.prefix = child.prefix[common..].to_vec();
        split.add_edge(moved.prefix[0], Arc::new(moved));

        let rest = &search[common..];
        if rest.is_empty() {
            split.leaf = Some(Self::new_leaf(key, value));
        } else {
            let mut sibling = Node::new(rest.to_vec());
            sibling.leaf = Some(Self::new_leaf(key, value));
            split.add_edge(rest[0], Arc::new(sibling));
        }

        let mut nc = self.write_node(n);
        nc.edges[idx].1 = Arc::new(split);
        (Arc::new(nc), None)
    }

    /// Absorbs a node's single child, concatenating compressed paths.
    fn merge_child(&mut self, n: &mut Node<V>) {
        let (_, child) = n.edges.remove(0);
        self.record(&child.notify);
        n.prefix.extend_from_slice(&child.prefix);
        n.leaf = child.leaf.clone();
        n.edges = child.edges.clone();
    }

    fn delete_rec(
        &mut self,
        n: &Arc<Node<V>>,
        search: &[u8],
        is_root: bool,
    ) -> Option<(Node<V>, Arc<Leaf<V>>)> {
        if search.is_empty() {
            let leaf = n.leaf.clone()?;
            self.record(&leaf.notify);
            let mut nc = self.write_node(n);
            nc.leaf = None;
            if !is_root && nc.edges.len() == 1 {
                self.merge_child(&mut nc);
            }
            return Some((nc, leaf));
        }

        let idx = n.edge_index(search[0]).ok()?;
        let child = n.edges[idx].1.clone();
        if !search.starts_with(&child.prefix) {
            return None;
        }

        let (new_child, leaf) = self.delete_rec(&child, &search[child.prefix.len()..], false)?;
        let mut nc = self.write_node(n);
        if new_child.leaf.is_none() && new_child.edges.is_empty() {
            nc.edges.remove(idx);
            if !is_root && nc.edges.len() == 1 && nc.leaf.is_none() {
                self.merge_child(&mut nc);
            }
        } else {
            nc.edges[idx].1 = Arc::new(new_child);
        }
        Some((nc, leaf))
    }

    /// Looks up `key` in the staged state with a watch handle.
    pub fn get_watch(&self, key: &[u8]) -> (Option<&V>, WatchHandle) {
        node::get_watch(&self.root, key)
    }

    /// Longest-prefix match against the staged state.
    pub fn longest_prefix(&self, key: &[u8]) -> Option<(&[u8], &V)> {
        node::longest_prefix(&self.root, key)
    }

    /// Ascending iteration over the staged state.
    pub fn iter(&self) -> Iter<V> {
        iter::iter_all(&self.root)
    }

    /// Ascending iteration over staged entries with keys `>= bound`.
    pub fn iter_from(&self, bound: &[u8]) -> Iter<V> {
        iter::iter_from(&self.root, bound)
    }

    /// Ascending iteration over staged entries whose keys start with
    /// `prefix`.
    pub fn iter_prefix(&self, prefix: &[u8]) -> Iter<V> {
        iter::iter_prefix(&self.root, prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::watch::WatchSet;

    fn fired(handle: &WatchHandle) -> bool {
        handle.has_fired()
    }

    #[test]
    fn test_insert_get() {
        let tree: Tree<u32> = Tree::new();
        let (tree, old) = tree.insert(b"foo", 1);
        assert_eq!(old, None);
        assert_eq!(tree.get(b"foo"), Some(&1));
        assert_eq!(tree.get(b"fo"), None);
        assert_eq!(tree.get(b"foob"), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_insert_replace() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"foo", 1);
        let (tree, old) = tree.insert(b"foo", 2);
        assert_eq!(old, Some(1));
        assert_eq!(tree.get(b"foo"), Some(&2));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_empty_key() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"", 7);
        assert_eq!(tree.get(b""), Some(&7));
        assert_eq!(tree.len(), 1);

        let (tree, old) = tree.delete(b"");
        assert_eq!(old, Some(7));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_split_and_merge() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"foobar", 1);
        let (tree, _) = tree.insert(b"foobaz", 2);
        let (tree, _) = tree.insert(b"foo", 3);
        assert_eq!(tree.get(b"foobar"), Some(&1));
        assert_eq!(tree.get(b"foobaz"), Some(&2));
        assert_eq!(tree.get(b"foo"), Some(&3));

        let (tree, old) = tree.delete(b"foobaz");
        assert_eq!(old, Some(2));
        assert_eq!(tree.get(b"foobar"), Some(&1));
        assert_eq!(tree.get(b"foo"), Some(&3));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_delete_missing() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"foo", 1);
        let (tree, old) = tree.delete(b"bar");
        assert_eq!(old, None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_structural_sharing() {
        let tree: Tree<u32> = Tree::new();
        let (old_tree, _) = tree.insert(b"alpha", 1);
        let (new_tree, _) = old_tree.insert(b"beta", 2);

        // The old root still observes its point-in-time state.
        assert_eq!(old_tree.get(b"beta"), None);
        assert_eq!(new_tree.get(b"beta"), Some(&2));
        assert_eq!(old_tree.len(), 1);
        assert_eq!(new_tree.len(), 2);
    }

    #[test]
    fn test_iteration_order() {
        let keys: &[&[u8]] = &[b"", b"a", b"aa", b"ab", b"abc", b"b", b"ba", b"zzz"];
        let mut tree: Tree<usize> = Tree::new();
        // Insert out of order.
        for (i, key) in keys.iter().enumerate().rev() {
            tree = tree.insert(key, i).0;
        }

        let got: Vec<Vec<u8>> = tree.iter().map(|(k, _)| k).collect();
        let want: Vec<Vec<u8>> = keys.iter().map(|k| k.to_vec()).collect();
        assert_eq!(got, want);

        let rev: Vec<Vec<u8>> = tree.rev_iter().map(|(k, _)| k).collect();
        let mut want_rev = want;
        want_rev.reverse();
        assert_eq!(rev, want_rev);
    }

    #[test]
    fn test_iter_from() {
        let mut tree: Tree<u32> = Tree::new();
        for key in [b"001".as_slice(), b"002", b"010", b"012", b"100"] {
            tree = tree.insert(key, 0).0;
        }

        let got: Vec<Vec<u8>> = tree.iter_from(b"005").map(|(k, _)| k).collect();
        assert_eq!(got, vec![b"010".to_vec(), b"012".to_vec(), b"100".to_vec()]);

        // Inclusive at an exact match.
        let got: Vec<Vec<u8>> = tree.iter_from(b"010").map(|(k, _)| k).collect();
        assert_eq!(got, vec![b"010".to_vec(), b"012".to_vec(), b"100".to_vec()]);

        // Bound past the end yields nothing.
        assert_eq!(tree.iter_from(b"999").count(), 0);

        // Empty bound yields everything.
        assert_eq!(tree.iter_from(b"").count(), 5);
    }

    #[test]
    fn test_rev_iter_from() {
        let mut tree: Tree<u32> = Tree::new();
        for key in [b"001".as_slice(), b"002", b"010", b"012", b"100"] {
            tree = tree.insert(key, 0).0;
        }

        let got: Vec<Vec<u8>> = tree.rev_iter_from(b"011").map(|(k, _)| k).collect();
        assert_eq!(got, vec![b"010".to_vec(), b"002".to_vec(), b"001".to_vec()]);

        // Inclusive at an exact match.
        let got: Vec<Vec<u8>> = tree.rev_iter_from(b"010").map(|(k, _)| k).collect();
        assert_eq!(got, vec![b"010".to_vec(), b"002".to_vec(), b"001".to_vec()]);

        // Bound below the smallest key yields nothing.
        assert_eq!(tree.rev_iter_from(b"000").count(), 0);
    }

    #[test]
    fn test_iter_prefix() {
        let mut tree: Tree<u32> = Tree::new();
        for key in [b"foo".as_slice(), b"foobar", b"foobaz", b"fun", b"zip"] {
            tree = tree.insert(key, 0).0;
        }

        let got: Vec<Vec<u8>> = tree.iter_prefix(b"foo").map(|(k, _)| k).collect();
        assert_eq!(
            got,
            vec![b"foo".to_vec(), b"foobar".to_vec(), b"foobaz".to_vec()]
        );

        let got: Vec<Vec<u8>> = tree.rev_iter_prefix(b"foo").map(|(k, _)| k).collect();
        assert_eq!(
            got,
            vec![b"foobaz".to_vec(), b"foobar".to_vec(), b"foo".to_vec()]
        );

        assert_eq!(tree.iter_prefix(b"nope").count(), 0);
        assert_eq!(tree.iter_prefix(b"").count(), 5);
    }

    #[test]
    fn test_longest_prefix() {
        let mut tree: Tree<u32> = Tree::new();
        for (key, v) in [(b"".as_slice(), 0u32), (b"foo", 1), (b"foozipzap", 2)] {
            tree = tree.insert(key, v).0;
        }

        let (key, v) = tree.longest_prefix(b"foo").unwrap();
        assert_eq!((key, *v), (b"foo".as_slice(), 1));

        let (key, v) = tree.longest_prefix(b"foozipzapzone").unwrap();
        assert_eq!((key, *v), (b"foozipzap".as_slice(), 2));

        let (key, v) = tree.longest_prefix(b"funky").unwrap();
        assert_eq!((key, *v), (b"".as_slice(), 0));
    }

    #[test]
    fn test_watch_fires_on_leaf_replace() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"foo", 1);

        let (val, handle) = tree.get_watch(b"foo");
        assert_eq!(val, Some(&1));
        assert!(!fired(&handle));

        let (_, _) = tree.insert(b"foo", 2);
        assert!(fired(&handle));
    }

    #[test]
    fn test_watch_fires_on_miss_then_insert() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"other", 1);

        let (val, handle) = tree.get_watch(b"foo");
        assert_eq!(val, None);

        let (_, _) = tree.insert(b"foo", 2);
        assert!(fired(&handle));
    }

    #[test]
    fn test_watch_prefix_iterator() {
        let mut tree: Tree<u32> = Tree::new();
        for key in [b"foo/a".as_slice(), b"foo/b", b"zip"] {
            tree = tree.insert(key, 0).0;
        }

        let it = tree.iter_prefix(b"foo/");
        let handle = it.watch();
        assert!(!fired(&handle));

        let (_, _) = tree.insert(b"foo/c", 1);
        assert!(fired(&handle));
    }

    #[test]
    fn test_txn_staged_reads_and_deferred_notify() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"foo", 1);
        let (_, handle) = tree.get_watch(b"foo");

        let mut txn = tree.txn();
        txn.insert(b"foo", 2);
        assert_eq!(txn.get(b"foo"), Some(&2));
        // Base tree untouched, notifier not yet closed.
        assert_eq!(tree.get(b"foo"), Some(&1));
        assert!(!fired(&handle));

        let snap = txn.snapshot();
        txn.insert(b"bar", 3);
        assert_eq!(snap.get(b"bar"), None);

        let (new_tree, pending) = txn.finish();
        assert_eq!(new_tree.get(b"foo"), Some(&2));
        assert!(!fired(&handle));
        for n in pending {
            n.close();
        }
        assert!(fired(&handle));
    }

    #[test]
    fn test_watch_set_over_tree() {
        let tree: Tree<u32> = Tree::new();
        let (tree, _) = tree.insert(b"watched", 1);

        let (_, handle) = tree.get_watch(b"watched");
        let mut ws = WatchSet::new();
        ws.add(handle);

        assert!(ws.watch(Duration::from_millis(5)), "nothing changed yet");
        let (_, _) = tree.insert(b"watched", 2);
        assert!(!ws.watch(Duration::from_secs(1)));
    }
}
