// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Indexer error types.

/// Errors produced while deriving index keys from objects or query args.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("want {want} argument(s), got {got}")]
    WrongArgCount { want: usize, got: usize },

    #[error("argument {pos} is invalid: want {want}")]
    WrongArgType { pos: usize, want: &'static str },

    #[error("object has unexpected type: want {want}")]
    WrongObjectType { want: &'static str },

    #[error("indexer does not support prefix lookups")]
    PrefixUnsupported,

    #[error("invalid uuid: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("uuid must be 16 bytes, got {0}")]
    InvalidUuidLength(usize),

    #[error("invalid uuid prefix {input:?}: {reason}")]
    InvalidUuidPrefix { input: String, reason: &'static str },

    #[error("conditional predicate failed: {0}")]
    Conditional(String),
}
