// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Table and index schema definitions with one-time validation.
//!
//! A schema is declared up front, validated when the database is created,
//! and never mutated afterwards (adding indexes to a live table goes
//! through a write transaction, which stages a replacement). Every table
//! must carry an `id` index that is unique and single-valued; it defines
//! object identity within the table.

mod error;

pub use error::SchemaError;

use std::collections::HashMap;
use std::sync::Arc;

use crate::index::Indexer;

/// The index every table must define, naming the primary key.
pub const ID_INDEX: &str = "id";

/// Suffix that selects the prefix codec for an index at query time.
pub const PREFIX_SUFFIX: &str = "_prefix";

/// Description of a single index on a table.
#[derive(Debug)]
pub struct IndexSchema {
    pub name: String,
    pub unique: bool,
    pub allow_missing: bool,
    pub indexer: Indexer,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>, indexer: Indexer) -> Self {
        Self {
            name: name.into(),
            unique: false,
            allow_missing: false,
            indexer,
        }
    }

    /// Marks the index unique: at most one object per encoded key.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Permits objects that yield no key to be omitted from this index.
    pub fn allow_missing(mut self) -> Self {
        self.allow_missing = true;
        self
    }

    pub(crate) fn validate(&self, table: &str) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::MissingIndexName {
                table: table.to_string(),
            });
        }
        if self.name.ends_with(PREFIX_SUFFIX) {
            return Err(SchemaError::ReservedIndexName {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

/// Description of one table: its name and its indexes, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    pub name: String,
    pub indexes: HashMap<String, Arc<IndexSchema>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indexes: HashMap::new(),
        }
    }

    /// Adds an index under its own name.
    pub fn with_index(mut self, index: IndexSchema) -> Self {
        self.indexes.insert(index.name.clone(), Arc::new(index));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::MissingTableName);
        }
        if self.indexes.is_empty() {
            return Err(SchemaError::NoIndexes {
                table: self.name.clone(),
            });
        }
        let id = self
            .indexes
            .get(ID_INDEX)
            .ok_or_else(|| SchemaError::MissingIdIndex {
                table: self.name.clone(),
            })?;
        if !id.unique {
            return Err(SchemaError::IdNotUnique {
                table: self.name.clone(),
            });
        }
        if !id.indexer.is_single() {
            return Err(SchemaError::IdNotSingle {
                table: self.name.clone(),
            });
        }
        for (key, index) in &self.indexes {
            index.validate(&self.name)?;
            if key != &index.name {
                return Err(SchemaError::IndexNameMismatch {
                    table: self.name.clone(),
                    key: key.clone(),
                    name: index.name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The full database schema: tables keyed by name.
#[derive(Debug, Clone, Default)]
pub struct DbSchema {
    pub tables: HashMap<String, TableSchema>,
}

impl DbSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table under its own name.
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), SchemaError> {
        if self.tables.is_empty() {
            return Err(SchemaError::NoTables);
        }
        for (key, table) in &self.tables {
            table.validate()?;
            if key != &table.name {
                return Err(SchemaError::TableNameMismatch {
                    key: key.clone(),
                    name: table.name.clone(),
                });
            }
        }
        Ok(())
    }
}
