// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Read operations: point lookups, range scans and prefix scans.
//!
//! Lookups name an index by its schema name for the exact codec, or with
//! a `_prefix` suffix for the prefix codec. Watch-aware variants hand back
//! the notifier of the deepest trie node observed, which fires when a
//! later commit changes anything the lookup saw (or could have seen).

use std::sync::Arc;

use crate::index::IndexArg;
use crate::radix::{Iter, RevIter, Tree};
use crate::schema::{DbSchema, IndexSchema, PREFIX_SUFFIX};
use crate::watch::WatchHandle;
use crate::Object;

use super::error::TxnError;
use super::Txn;

/// A cursor over one index lookup.
///
/// Yields objects in encoded-key order (reverse order for the `_reverse`
/// constructors); for non-unique indexes entries with equal index keys
/// come out in primary-id order. The cursor is pinned to the view it was
/// created from: later commits never appear mid-iteration.
pub struct ResultIter {
    inner: ResultIterInner,
    watch: WatchHandle,
}

enum ResultIterInner {
    Forward(Iter<Object>),
    Reverse(RevIter<Object>),
}

impl ResultIter {
    fn forward(iter: Iter<Object>) -> Self {
        let watch = iter.watch();
        Self {
            inner: ResultIterInner::Forward(iter),
            watch,
        }
    }

    fn reverse(iter: RevIter<Object>) -> Self {
        let watch = iter.watch();
        Self {
            inner: ResultIterInner::Reverse(iter),
            watch,
        }
    }

    /// Fires when a later commit mutates the scanned slice of the index.
    pub fn watch(&self) -> WatchHandle {
        self.watch.clone()
    }
}

impl Iterator for ResultIter {
    type Item = Object;

    fn next(&mut self) -> Option<Object> {
        match &mut self.inner {
            ResultIterInner::Forward(iter) => iter.next().map(|(_, obj)| obj),
            ResultIterInner::Reverse(iter) => iter.next().map(|(_, obj)| obj),
        }
    }
}

/// Resolves an index expression to its schema entry and encoded key.
pub(crate) fn index_params<'s>(
    schema: &'s DbSchema,
    table: &str,
    index: &str,
    args: &[IndexArg],
) -> Result<(&'s Arc<IndexSchema>, Vec<u8>, bool), TxnError> {
    let table_schema = schema
        .tables
        .get(table)
        .ok_or_else(|| TxnError::UnknownTable(table.to_string()))?;
    let (name, is_prefix) = match index.strip_suffix(PREFIX_SUFFIX) {
        Some(base) => (base, true),
        None => (index, false),
    };
    let index_schema =
        table_schema
            .indexes
            .get(name)
            .ok_or_else(|| TxnError::UnknownIndex {
                table: table.to_string(),
                index: index.to_string(),
            })?;
    let key = if is_prefix {
        index_schema.indexer.prefix_from_args(args)?
    } else {
        index_schema.indexer.from_args(args)?
    };
    Ok((index_schema, key, is_prefix))
}

impl<'db> Txn<'db> {
    /// Returns the first object matching the index expression, in
    /// encoded-key order.
    pub fn first(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<Option<Object>, TxnError> {
        self.first_watch(table, index, args).map(|(_, obj)| obj)
    }

    /// [`Txn::first`] plus the watch handle covering the lookup.
    pub fn first_watch(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<(WatchHandle, Option<Object>), TxnError> {
        let schema = self.effective_schema();
        let (index_schema, key, is_prefix) = index_params(&schema, table, index, args)?;
        let tree = self.readable_tree(table, &index_schema.name);
        if index_schema.unique && !is_prefix {
            let (obj, watch) = tree.get_watch(&key);
            return Ok((watch, obj.cloned()));
        }
        let mut iter = tree.iter_prefix(&key);
        let watch = iter.watch();
        Ok((watch, iter.next().map(|(_, obj)| obj)))
    }

    /// Returns the last object matching the index expression.
    pub fn last(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<Option<Object>, TxnError> {
        self.last_watch(table, index, args).map(|(_, obj)| obj)
    }

    /// [`Txn::last`] plus the watch handle covering the lookup.
    pub fn last_watch(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<(WatchHandle, Option<Object>), TxnError> {
        let schema = self.effective_schema();
        let (index_schema, key, is_prefix) = index_params(&schema, table, index, args)?;
        let tree = self.readable_tree(table, &index_schema.name);
        if index_schema.unique && !is_prefix {
            let (obj, watch) = tree.get_watch(&key);
            return Ok((watch, obj.cloned()));
        }
        let mut iter = tree.rev_iter_prefix(&key);
        let watch = iter.watch();
        Ok((watch, iter.next().map(|(_, obj)| obj)))
    }

    /// Returns an ascending cursor over every object matching the index
    /// expression.
    pub fn get(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<ResultIter, TxnError> {
        let (tree, key) = self.scan_target(table, index, args)?;
        Ok(ResultIter::forward(tree.iter_prefix(&key)))
    }

    /// Returns a descending cursor over every object matching the index
    /// expression.
    pub fn get_reverse(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<ResultIter, TxnError> {
        let (tree, key) = self.scan_target(table, index, args)?;
        Ok(ResultIter::reverse(tree.rev_iter_prefix(&key)))
    }

    /// Returns an ascending cursor starting at the encoded key, with no
    /// prefix constraint: iteration continues to the end of the index.
    pub fn lower_bound(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<ResultIter, TxnError> {
        let (tree, key) = self.scan_target(table, index, args)?;
        Ok(ResultIter::forward(tree.iter_from(&key)))
    }

    /// Returns a descending cursor starting at the largest key less than
    /// or equal to the encoded key.
    pub fn reverse_lower_bound(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<ResultIter, TxnError> {
        let (tree, key) = self.scan_target(table, index, args)?;
        Ok(ResultIter::reverse(tree.rev_iter_from(&key)))
    }

    /// Returns the object stored under the longest key that is a prefix of
    /// the encoded arguments.
    ///
    /// Only valid through the `<name>_prefix` form of a unique index whose
    /// indexer does not append the string terminator; terminated encodings
    /// would never be prefixes of one another.
    pub fn longest_prefix(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<Option<Object>, TxnError> {
        if !index.ends_with(PREFIX_SUFFIX) {
            return Err(TxnError::InvalidIndex {
                index: index.to_string(),
                reason: "longest_prefix requires the <name>_prefix form",
            });
        }
        let schema = self.effective_schema();
        let (index_schema, key, _) = index_params(&schema, table, index, args)?;
        if !index_schema.unique {
            return Err(TxnError::InvalidIndex {
                index: index.to_string(),
                reason: "longest_prefix requires a unique index",
            });
        }
        if index_schema.indexer.terminated() {
            return Err(TxnError::InvalidIndex {
                index: index.to_string(),
                reason: "longest_prefix requires an unterminated encoding",
            });
        }
        let tree = self.readable_tree(table, &index_schema.name);
        Ok(tree.longest_prefix(&key).map(|(_, obj)| obj.clone()))
    }

    /// Collects every object matching the index expression, in ascending
    /// encoded-key order.
    pub fn find(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<Vec<Object>, TxnError> {
        Ok(self.get(table, index, args)?.collect())
    }

    fn scan_target(
        &self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<(Tree<Object>, Vec<u8>), TxnError> {
        let schema = self.effective_schema();
        let (index_schema, key, _) = index_params(&schema, table, index, args)?;
        let tree = self.readable_tree(table, &index_schema.name);
        Ok((tree, key))
    }
}
