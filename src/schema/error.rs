// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Schema validation error types.

/// Errors raised when a schema is validated at database creation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema has no tables defined")]
    NoTables,

    #[error("table name mismatch: keyed {key:?}, named {name:?}")]
    TableNameMismatch { key: String, name: String },

    #[error("missing table name")]
    MissingTableName,

    #[error("table {table:?} has no indexes")]
    NoIndexes { table: String },

    #[error("table {table:?} must have an id index")]
    MissingIdIndex { table: String },

    #[error("table {table:?}: id index must be unique")]
    IdNotUnique { table: String },

    #[error("table {table:?}: id index must be single-valued")]
    IdNotSingle { table: String },

    #[error("table {table:?}: index name mismatch: keyed {key:?}, named {name:?}")]
    IndexNameMismatch {
        table: String,
        key: String,
        name: String,
    },

    #[error("table {table:?}: missing index name")]
    MissingIndexName { table: String },

    #[error("index name {name:?} is reserved for prefix lookups")]
    ReservedIndexName { name: String },
}
