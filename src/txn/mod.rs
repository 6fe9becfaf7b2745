// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Short-lived transactions over the database root.
//!
//! A transaction captures the root (schema + catalog pair) at creation and
//! stages every mutation in per-index trie builders, so readers observe a
//! stable point-in-time view while the single writer works. Commit
//! finalizes the builders, swaps the database root atomically, closes the
//! notifiers of superseded trie nodes, and runs deferred callbacks in LIFO
//! order. Abort discards everything.
//!
//! # Key Concepts
//!
//! ## Read-your-writes
//!
//! Reads inside a write transaction consult the staged builders first, so
//! a transaction always sees its own mutations; other transactions see
//! nothing until commit.
//!
//! ## Mutation log
//!
//! With change tracking enabled the transaction keeps a compacted log per
//! object identity: repeated writes fold into one entry preserving the
//! original `before`, and an object created and deleted in the same
//! transaction vanishes from the log entirely.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use iridiumdb::{DbSchema, IndexSchema, Indexer, MemDb, TableSchema};
//! use iridiumdb::index::StringFieldIndex;
//!
//! struct Item { id: String }
//!
//! let schema = DbSchema::new().with_table(
//!     TableSchema::new("items").with_index(
//!         IndexSchema::new(
//!             "id",
//!             Indexer::single(StringFieldIndex::new(|i: &Item| Some(i.id.clone()))),
//!         )
//!         .unique(),
//!     ),
//! );
//!
//! let db = MemDb::new(schema).unwrap();
//! let mut txn = db.txn(true).unwrap();
//! txn.insert("items", Arc::new(Item { id: "a".into() })).unwrap();
//! txn.commit().unwrap();
//!
//! let read = db.txn(false).unwrap();
//! assert!(read.first("items", "id", &["a".into()]).unwrap().is_some());
//! ```

mod changes;
mod error;
mod read;
mod write;

pub use changes::Change;
pub use error::TxnError;
pub use read::ResultIter;

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::MutexGuard;
use tracing::{debug, error};

use crate::db::{Catalog, DbRoot, MemDb};
use crate::radix::TreeTxn;
use crate::schema::DbSchema;
use crate::Object;

use changes::ChangeLog;

/// A single-use transaction: start, read and mutate, then commit or abort.
///
/// Read transactions are cheap and unbounded; a write transaction holds
/// the database writer lock until it reaches a terminal state. Commit and
/// abort are idempotent, and a transaction dropped without commit releases
/// the lock with nothing published.
pub struct Txn<'db> {
    db: &'db MemDb,
    write: bool,
    root: Arc<DbRoot>,
    guard: Option<MutexGuard<'db, ()>>,
    finished: bool,
    modified: HashMap<(String, String), TreeTxn<Object>>,
    staged_schema: Option<Arc<DbSchema>>,
    changes: Option<ChangeLog>,
    tracking: bool,
    committed: Option<Vec<Change>>,
    defers: Vec<Box<dyn FnOnce() + 'db>>,
    no_log: bool,
}

impl<'db> Txn<'db> {
    pub(crate) fn new(
        db: &'db MemDb,
        write: bool,
        guard: Option<MutexGuard<'db, ()>>,
        no_log: bool,
    ) -> Self {
        let root = db.root_handle();
        // A database with a WAL logs every write transaction internally,
        // whether or not the caller asks to see the changes.
        let changes = (write && !no_log && db.wal_handle().is_some()).then(ChangeLog::new);
        Self {
            db,
            write,
            root,
            guard,
            finished: false,
            modified: HashMap::new(),
            staged_schema: None,
            changes,
            tracking: false,
            committed: None,
            defers: Vec::new(),
            no_log,
        }
    }

    /// Returns true if this is a write transaction.
    #[inline]
    pub fn is_write(&self) -> bool {
        self.write
    }

    /// Returns true if the transaction has committed or aborted.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Enables change tracking; [`Txn::changes`] and the commit return
    /// value expose the compacted mutation list.
    pub fn track_changes(&mut self) {
        self.tracking = true;
        if self.changes.is_none() {
            self.changes = Some(ChangeLog::new());
        }
    }

    /// The compacted mutation list, if tracking was enabled: the staged
    /// log before commit, the published list afterwards.
    pub fn changes(&self) -> Option<Vec<Change>> {
        if !self.tracking {
            return None;
        }
        if let Some(done) = &self.committed {
            return Some(done.clone());
        }
        self.changes.as_ref().map(|log| log.changes())
    }

    /// Registers a callback to run after a successful commit. Callbacks
    /// run in reverse registration order; an aborted transaction never
    /// runs them.
    pub fn defer(&mut self, f: impl FnOnce() + 'db) {
        self.defers.push(Box::new(f));
    }

    /// Commits the staged mutations atomically.
    ///
    /// Returns the tracked change list when [`Txn::track_changes`] was
    /// called. A second commit (or a commit after abort) is a no-op.
    pub fn commit(&mut self) -> Result<Option<Vec<Change>>, TxnError> {
        if self.finished || !self.write {
            self.finished = true;
            return Ok(self.changes());
        }

        let change_list = self.changes.as_ref().map(|log| log.changes());

        // Write-ahead: the log sees the changes before the swap makes them
        // visible. A log failure leaves the transaction live so the caller
        // can abort.
        if let (Some(wal), Some(list)) = (self.db.wal_handle(), &change_list) {
            if !self.no_log {
                for change in list {
                    wal.write_entry(change)?;
                }
            }
        }

        let mut catalog = Catalog::clone(&self.root.catalog);
        let mut pending = Vec::new();
        let touched = self.modified.len();
        for ((table, index), builder) in self.modified.drain() {
            let (tree, notifies) = builder.finish();
            catalog.set(&table, &index, tree);
            pending.extend(notifies);
        }

        let schema = self
            .staged_schema
            .take()
            .unwrap_or_else(|| self.root.schema.clone());
        self.db.publish(Arc::new(DbRoot {
            schema,
            catalog: Arc::new(catalog),
        }));

        for notify in pending {
            notify.close();
        }

        self.changes = None;
        self.committed = change_list;
        self.finished = true;
        self.guard = None;
        debug!(
            indexes = touched,
            changes = self.committed.as_ref().map_or(0, Vec::len),
            "transaction committed"
        );

        let defers = std::mem::take(&mut self.defers);
        for f in defers.into_iter().rev() {
            // A panicking callback must not poison the committed state.
            if catch_unwind(AssertUnwindSafe(f)).is_err() {
                error!("deferred callback panicked");
            }
        }

        Ok(self.changes())
    }

    /// Discards all staged mutations and releases the writer lock.
    /// Deferred callbacks do not run. Idempotent.
    pub fn abort(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if !self.write {
            return;
        }
        self.modified.clear();
        self.changes = None;
        self.staged_schema = None;
        self.defers.clear();
        self.guard = None;
        debug!("transaction aborted");
    }

    /// Captures the transaction's current merged view as a read-only
    /// database handle. The snapshot is unaffected by later mutations or
    /// the eventual commit/abort of this transaction.
    pub fn snapshot(&self) -> MemDb {
        let mut catalog = Catalog::clone(&self.root.catalog);
        for ((table, index), builder) in &self.modified {
            catalog.set(table, index, builder.snapshot());
        }
        MemDb::read_only(Arc::new(DbRoot {
            schema: self.effective_schema(),
            catalog: Arc::new(catalog),
        }))
    }

    /// The schema this transaction operates against, including any indexes
    /// staged by [`Txn::create_indexes`].
    pub(crate) fn effective_schema(&self) -> Arc<DbSchema> {
        self.staged_schema
            .clone()
            .unwrap_or_else(|| self.root.schema.clone())
    }

    /// Read view of one index: the staged builder for a write transaction
    /// that touched it, the captured root otherwise.
    pub(crate) fn readable_tree(
        &self,
        table: &str,
        index: &str,
    ) -> crate::radix::Tree<Object> {
        if let Some(builder) = self.modified.get(&(table.to_string(), index.to_string())) {
            return builder.snapshot();
        }
        self.root
            .catalog
            .tree(table, index)
            .cloned()
            .unwrap_or_default()
    }

    /// Staged builder for one index, created from the captured root on
    /// first write.
    pub(crate) fn writable_tree(&mut self, table: &str, index: &str) -> &mut TreeTxn<Object> {
        let base = self
            .root
            .catalog
            .tree(table, index)
            .cloned()
            .unwrap_or_default();
        self.modified
            .entry((table.to_string(), index.to_string()))
            .or_insert_with(|| base.txn())
    }

    pub(crate) fn require_write(&self) -> Result<(), TxnError> {
        if !self.write {
            return Err(TxnError::ReadOnlyTxn);
        }
        if self.finished {
            return Err(TxnError::TerminalTxn);
        }
        Ok(())
    }

    pub(crate) fn record_change(&mut self, change: Change) {
        if let Some(log) = &mut self.changes {
            log.record(change);
        }
    }
}
