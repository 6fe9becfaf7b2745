// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! The database root: an atomically swappable (schema, catalog) pair.
//!
//! A [`MemDb`] owns one trie root per (table, index). Commits replace the
//! whole pair through a single pointer swap, so concurrent readers always
//! observe either the pre-commit or the post-commit state in full, never
//! a mixture. Snapshots wrap the current pair in a non-primary handle
//! that rejects write transactions.
//!
//! # Key Concepts
//!
//! ## Single writer, many readers
//!
//! `txn(true)` takes the writer mutex for the transaction's lifetime;
//! readers only clone the root pointer and never block anyone.
//!
//! ## Replay on open
//!
//! [`MemDb::with_wal`] drains the supplied log through a no-log write
//! transaction before returning, so a crash-recovered database starts
//! from its last published state without re-entering the log.

mod error;

pub use error::DbError;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::radix::Tree;
use crate::schema::DbSchema;
use crate::txn::Txn;
use crate::wal::Wal;
use crate::Object;

/// The two-level mapping (table, index) → trie root.
#[derive(Clone, Default)]
pub(crate) struct Catalog {
    tables: HashMap<String, HashMap<String, Tree<Object>>>,
}

impl Catalog {
    pub(crate) fn tree(&self, table: &str, index: &str) -> Option<&Tree<Object>> {
        self.tables.get(table)?.get(index)
    }

    pub(crate) fn set(&mut self, table: &str, index: &str, tree: Tree<Object>) {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(index.to_string(), tree);
    }
}

/// The atomically swapped root: schema and catalog move as one unit so a
/// reader can never pair a new schema with an old catalog.
pub(crate) struct DbRoot {
    pub(crate) schema: Arc<DbSchema>,
    pub(crate) catalog: Arc<Catalog>,
}

/// An in-memory multi-index object store with MVCC transactions.
///
/// Objects are stored by reference and must not be mutated after
/// insertion; older snapshots may still be reading them.
pub struct MemDb {
    root: RwLock<Arc<DbRoot>>,
    primary: bool,
    writer: Mutex<()>,
    wal: Option<Arc<dyn Wal>>,
}

impl MemDb {
    /// Creates a database from a validated schema.
    pub fn new(schema: DbSchema) -> Result<Self, DbError> {
        Self::build(schema, None)
    }

    /// Creates a database backed by a write-ahead log, replaying the log's
    /// existing entries before returning.
    pub fn with_wal(schema: DbSchema, wal: Arc<dyn Wal>) -> Result<Self, DbError> {
        let db = Self::build(schema, Some(wal.clone()))?;
        let mut replayed = 0usize;
        {
            let mut txn = Txn::new(&db, true, Some(db.writer.lock()), true);
            for change in wal.replay() {
                trace!(table = %change.table, "replaying log entry");
                if let Some(after) = change.after.clone() {
                    txn.insert(&change.table, after)?;
                } else if let Some(before) = change.before.clone() {
                    txn.delete(&change.table, before)?;
                }
                replayed += 1;
            }
            txn.commit()?;
        }
        debug!(entries = replayed, "write-ahead log replayed");
        Ok(db)
    }

    /// Creates a database and seeds it with initial objects per table in
    /// one internal write transaction.
    pub fn with_data(
        schema: DbSchema,
        data: Vec<(String, Vec<Object>)>,
    ) -> Result<Self, DbError> {
        let db = Self::build(schema, None)?;
        {
            let mut txn = db.txn(true)?;
            for (table, objects) in data {
                for obj in objects {
                    txn.insert(&table, obj)?;
                }
            }
            txn.commit()?;
        }
        Ok(db)
    }

    fn build(schema: DbSchema, wal: Option<Arc<dyn Wal>>) -> Result<Self, DbError> {
        schema.validate()?;
        let mut catalog = Catalog::default();
        for (table_name, table) in &schema.tables {
            for index_name in table.indexes.keys() {
                catalog.set(table_name, index_name, Tree::new());
            }
        }
        Ok(Self {
            root: RwLock::new(Arc::new(DbRoot {
                schema: Arc::new(schema),
                catalog: Arc::new(catalog),
            })),
            primary: true,
            writer: Mutex::new(()),
            wal,
        })
    }

    /// Starts a transaction. At most one write transaction exists at a
    /// time; `txn(true)` blocks until the current writer finishes.
    ///
    /// Fails with [`DbError::ReadOnlySnapshot`] when a write transaction
    /// is requested on a snapshot handle.
    pub fn txn(&self, write: bool) -> Result<Txn<'_>, DbError> {
        if write && !self.primary {
            return Err(DbError::ReadOnlySnapshot);
        }
        let guard = write.then(|| self.writer.lock());
        Ok(Txn::new(self, write, guard, false))
    }

    /// Captures a point-in-time, read-only handle. The snapshot observes
    /// none of the commits made after this call.
    pub fn snapshot(&self) -> MemDb {
        MemDb::read_only(self.root_handle())
    }

    /// The schema in use, for introspection. Never mutate the returned
    /// value's contents.
    pub fn db_schema(&self) -> Arc<DbSchema> {
        self.root.read().schema.clone()
    }

    pub(crate) fn read_only(root: Arc<DbRoot>) -> MemDb {
        MemDb {
            root: RwLock::new(root),
            primary: false,
            writer: Mutex::new(()),
            wal: None,
        }
    }

    pub(crate) fn root_handle(&self) -> Arc<DbRoot> {
        self.root.read().clone()
    }

    pub(crate) fn wal_handle(&self) -> Option<&Arc<dyn Wal>> {
        self.wal.as_ref()
    }

    pub(crate) fn publish(&self, root: Arc<DbRoot>) {
        *self.root.write() = root;
    }
}
