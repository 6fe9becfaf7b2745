// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Database error types.

use crate::schema::SchemaError;
use crate::txn::TxnError;

/// Errors raised when creating a database or opening a transaction.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("cannot open a write transaction on a snapshot")]
    ReadOnlySnapshot,

    #[error(transparent)]
    Txn(#[from] TxnError),
}
