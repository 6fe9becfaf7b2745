// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! IridiumDB: an in-memory, schema-defined, multi-index object store with
//! MVCC transactions built on persistent radix tries.
//!
//! Tables and their indexes are declared up front; opaque objects are
//! inserted, updated, deleted, looked up and range-scanned through
//! short-lived transactions. Readers observe a stable point-in-time view
//! while at most one writer applies its mutations atomically across every
//! index. Watch handles let callers block until any observed slice of the
//! store changes, and an optional write-ahead log collaborator receives
//! the compacted change stream of every commit.
//!
//! Objects are stored by shared reference and never copied: once
//! inserted, a value must not be mutated, since older snapshots may still
//! be reading it.

pub mod db;
pub mod index;
pub mod radix;
pub mod schema;
pub mod txn;
pub mod wal;
pub mod watch;

#[cfg(test)]
mod testutil;

use std::any::Any;
use std::sync::Arc;

/// An opaque stored value: shared ownership, immutable while live.
pub type Object = Arc<dyn Any + Send + Sync>;

pub use db::{DbError, MemDb};
pub use index::{IndexArg, IndexError, Indexer};
pub use schema::{DbSchema, IndexSchema, SchemaError, TableSchema};
pub use txn::{Change, ResultIter, Txn, TxnError};
pub use wal::{MemoryWal, Wal, WalError};
pub use watch::{WatchHandle, WatchSet};
