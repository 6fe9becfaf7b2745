// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Transaction error types.

use crate::index::IndexError;
use crate::schema::SchemaError;
use crate::wal::WalError;

/// Errors that can occur in transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TxnError {
    #[error("not found")]
    NotFound,

    #[error("duplicate key in unique index {index:?} of table {table:?}")]
    DuplicateKey { table: String, index: String },

    #[error("unknown table {0:?}")]
    UnknownTable(String),

    #[error("unknown index {index:?} on table {table:?}")]
    UnknownIndex { table: String, index: String },

    #[error("invalid use of index {index:?}: {reason}")]
    InvalidIndex { index: String, reason: &'static str },

    #[error("missing value for index {index:?}")]
    MissingIndexValue { index: String },

    #[error("cannot write in a read-only transaction")]
    ReadOnlyTxn,

    #[error("transaction is already finished")]
    TerminalTxn,

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("write-ahead log: {0}")]
    Wal(#[from] WalError),
}
