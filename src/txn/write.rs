// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Write operations: insert, delete, bulk deletes and live index creation.

use std::sync::Arc;

use crate::index::{IndexArg, TERMINATOR};
use crate::radix::Tree;
use crate::schema::{DbSchema, IndexSchema, TableSchema, ID_INDEX, PREFIX_SUFFIX};
use crate::Object;

use super::changes::Change;
use super::error::TxnError;
use super::Txn;

/// Derives the primary key bytes for an object.
fn primary_key(
    table_schema: &TableSchema,
    obj: &Object,
) -> Result<Vec<u8>, TxnError> {
    let id_schema = table_schema
        .indexes
        .get(ID_INDEX)
        .ok_or_else(|| TxnError::UnknownIndex {
            table: table_schema.name.clone(),
            index: ID_INDEX.to_string(),
        })?;
    id_schema
        .indexer
        .keys_from_object(obj.as_ref())?
        .and_then(|mut keys| keys.pop())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| TxnError::MissingIndexValue {
            index: ID_INDEX.to_string(),
        })
}

/// Appends the primary key to a non-unique index key, separated by the
/// terminator, so trie keys stay globally unique while preserving
/// secondary ordering.
fn suffix_keys(keys: &mut [Vec<u8>], id_key: &[u8]) {
    for key in keys {
        key.push(TERMINATOR);
        key.extend_from_slice(id_key);
    }
}

impl<'db> Txn<'db> {
    /// Inserts `obj` into `table`, updating every index.
    ///
    /// An object whose primary key already exists replaces the stored
    /// object: index keys the new object no longer produces are removed,
    /// the rest are overwritten in place. Inserting into a unique index
    /// whose key is held by a different primary id fails with
    /// [`TxnError::DuplicateKey`].
    pub fn insert(&mut self, table: &str, obj: Object) -> Result<(), TxnError> {
        self.require_write()?;
        let schema = self.effective_schema();
        let table_schema = schema
            .tables
            .get(table)
            .ok_or_else(|| TxnError::UnknownTable(table.to_string()))?;

        let id_key = primary_key(table_schema, &obj)?;
        let existing = self.writable_tree(table, ID_INDEX).get(&id_key).cloned();

        for (name, index_schema) in &table_schema.indexes {
            let mut new_keys = index_schema.indexer.keys_from_object(obj.as_ref())?;
            if let Some(keys) = &mut new_keys {
                if !index_schema.unique {
                    suffix_keys(keys, &id_key);
                }
            }

            // An update first drops the stale keys of the object being
            // replaced, keeping any the new object still produces.
            if let Some(prev) = &existing {
                if let Some(mut old_keys) = index_schema.indexer.keys_from_object(prev.as_ref())? {
                    if !index_schema.unique {
                        suffix_keys(&mut old_keys, &id_key);
                    }
                    let kept: &[Vec<u8>] = new_keys.as_deref().unwrap_or(&[]);
                    for old_key in old_keys {
                        if !kept.contains(&old_key) {
                            self.writable_tree(table, name).delete(&old_key);
                        }
                    }
                }
            }

            let Some(keys) = new_keys else {
                if index_schema.allow_missing {
                    continue;
                }
                return Err(TxnError::MissingIndexValue { index: name.clone() });
            };

            for key in keys {
                if index_schema.unique {
                    let occupant = self.writable_tree(table, name).get(&key).cloned();
                    if let Some(occupant) = occupant {
                        if primary_key(table_schema, &occupant)? != id_key {
                            return Err(TxnError::DuplicateKey {
                                table: table.to_string(),
                                index: name.clone(),
                            });
                        }
                    }
                }
                self.writable_tree(table, name).insert(&key, obj.clone());
            }
        }

        self.record_change(Change {
            table: table.to_string(),
            before: existing,
            after: Some(obj),
            primary_key: id_key,
        });
        Ok(())
    }

    /// Deletes the stored object with `obj`'s primary key from every
    /// index. Fails with [`TxnError::NotFound`] when nothing is stored
    /// under that key.
    pub fn delete(&mut self, table: &str, obj: Object) -> Result<(), TxnError> {
        self.require_write()?;
        let schema = self.effective_schema();
        let table_schema = schema
            .tables
            .get(table)
            .ok_or_else(|| TxnError::UnknownTable(table.to_string()))?;

        let id_key = primary_key(table_schema, &obj)?;
        let existing = self
            .writable_tree(table, ID_INDEX)
            .get(&id_key)
            .cloned()
            .ok_or(TxnError::NotFound)?;

        // Index keys are derived from the stored object, not the argument:
        // the caller may hold an outdated copy.
        for (name, index_schema) in &table_schema.indexes {
            if let Some(mut keys) = index_schema.indexer.keys_from_object(existing.as_ref())? {
                if !index_schema.unique {
                    suffix_keys(&mut keys, &id_key);
                }
                for key in keys {
                    self.writable_tree(table, name).delete(&key);
                }
            }
        }

        self.record_change(Change {
            table: table.to_string(),
            before: Some(existing),
            after: None,
            primary_key: id_key,
        });
        Ok(())
    }

    /// Deletes every object matching the index expression. Returns the
    /// number of objects removed.
    pub fn delete_all(
        &mut self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<usize, TxnError> {
        self.require_write()?;
        // Collect before deleting so the scan is not invalidated by the
        // deletes themselves.
        let objects = self.find(table, index, args)?;
        let count = objects.len();
        for obj in objects {
            self.delete(table, obj)?;
        }
        Ok(count)
    }

    /// Deletes every object whose index key starts with the encoded
    /// prefix. Returns true if anything was removed.
    pub fn delete_prefix(
        &mut self,
        table: &str,
        index: &str,
        args: &[IndexArg],
    ) -> Result<bool, TxnError> {
        self.require_write()?;
        if !index.ends_with(PREFIX_SUFFIX) {
            return Err(TxnError::InvalidIndex {
                index: index.to_string(),
                reason: "delete_prefix requires the <name>_prefix form",
            });
        }
        let objects = self.find(table, index, args)?;
        let removed = !objects.is_empty();
        for obj in objects {
            self.delete(table, obj)?;
        }
        Ok(removed)
    }

    /// Registers additional indexes on a live table and back-fills them
    /// from the primary index.
    ///
    /// The new indexes are staged with the transaction: they become
    /// visible (with the rest of its writes) only at commit, and an error
    /// anywhere leaves the schema unchanged.
    pub fn create_indexes(
        &mut self,
        table: &str,
        indexes: Vec<IndexSchema>,
    ) -> Result<(), TxnError> {
        self.require_write()?;
        let schema = self.effective_schema();
        let table_schema = schema
            .tables
            .get(table)
            .ok_or_else(|| TxnError::UnknownTable(table.to_string()))?;

        let mut new_table = table_schema.clone();
        let mut added = Vec::with_capacity(indexes.len());
        for index in indexes {
            index.validate(table).map_err(TxnError::Schema)?;
            if new_table.indexes.contains_key(&index.name) {
                return Err(TxnError::InvalidIndex {
                    index: index.name.clone(),
                    reason: "index already exists",
                });
            }
            let index = Arc::new(index);
            new_table.indexes.insert(index.name.clone(), index.clone());
            added.push(index);
        }
        if added.is_empty() {
            return Ok(());
        }

        // Back-fill into local builders first; nothing is adopted until
        // every new index built cleanly.
        let id_tree = self.readable_tree(table, ID_INDEX);
        let mut builders: Vec<_> = added
            .iter()
            .map(|index| (index.clone(), Tree::new().txn()))
            .collect();
        for (id_key, obj) in id_tree.iter() {
            for (index_schema, builder) in builders.iter_mut() {
                let Some(mut keys) = index_schema.indexer.keys_from_object(obj.as_ref())? else {
                    if index_schema.allow_missing {
                        continue;
                    }
                    return Err(TxnError::MissingIndexValue {
                        index: index_schema.name.clone(),
                    });
                };
                if !index_schema.unique {
                    suffix_keys(&mut keys, &id_key);
                }
                for key in keys {
                    if index_schema.unique && builder.get(&key).is_some() {
                        return Err(TxnError::DuplicateKey {
                            table: table.to_string(),
                            index: index_schema.name.clone(),
                        });
                    }
                    builder.insert(&key, obj.clone());
                }
            }
        }

        for (index_schema, builder) in builders {
            self.modified
                .insert((table.to_string(), index_schema.name.clone()), builder);
        }
        let mut new_schema = DbSchema::clone(&schema);
        new_schema.tables.insert(table.to_string(), new_table);
        self.staged_schema = Some(Arc::new(new_schema));
        Ok(())
    }
}
