// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Write-ahead log error types.

/// Errors surfaced by a write-ahead log implementation.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt entry: {0}")]
    Corrupt(String),
}
