// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Change tracking: the per-transaction mutation log and its compaction.

use std::collections::HashMap;

use crate::Object;

/// The net effect of a transaction on one object identity.
///
/// `before` and `after` are the stored references; exactly one may be
/// absent. A creation has no `before`, a deletion has no `after`, an
/// update carries both.
#[derive(Clone)]
pub struct Change {
    pub table: String,
    pub before: Option<Object>,
    pub after: Option<Object>,
    pub(crate) primary_key: Vec<u8>,
}

impl Change {
    /// True if the change describes a new object being inserted.
    #[inline]
    pub fn created(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    /// True if the change describes an existing object being updated.
    #[inline]
    pub fn updated(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }

    /// True if the change describes an existing object being deleted.
    #[inline]
    pub fn deleted(&self) -> bool {
        self.before.is_some() && self.after.is_none()
    }

    /// The raw primary-index key of the affected object.
    ///
    /// This is an implementation detail intended for write-ahead log
    /// writers; domain consumers should identify objects through their
    /// own fields on `before`/`after`.
    pub fn primary_key_bytes(&self) -> &[u8] {
        &self.primary_key
    }
}

impl std::fmt::Debug for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.created() {
            "created"
        } else if self.deleted() {
            "deleted"
        } else {
            "updated"
        };
        f.debug_struct("Change")
            .field("table", &self.table)
            .field("kind", &kind)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// Insertion-ordered mutation log keyed by (table, primary key), with
/// in-place compaction.
///
/// A second write to the same identity updates the existing entry's
/// `after` and preserves the original `before`; an entry whose `before`
/// and `after` both end up absent was created and deleted within the
/// transaction and is erased entirely.
#[derive(Default)]
pub(crate) struct ChangeLog {
    entries: Vec<Option<Change>>,
    index: HashMap<(String, Vec<u8>), usize>,
}

impl ChangeLog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, change: Change) {
        let key = (change.table.clone(), change.primary_key.clone());
        match self.index.get(&key) {
            Some(&slot) => {
                if let Some(entry) = self.entries[slot].as_mut() {
                    entry.after = change.after;
                    if entry.before.is_none() && entry.after.is_none() {
                        self.entries[slot] = None;
                        self.index.remove(&key);
                    }
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(Some(change));
            }
        }
    }

    /// The compacted list in first-insertion order.
    pub(crate) fn changes(&self) -> Vec<Change> {
        self.entries.iter().flatten().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn obj(tag: &str) -> Object {
        Arc::new(tag.to_string())
    }

    fn tag(o: &Object) -> &str {
        o.downcast_ref::<String>().unwrap()
    }

    fn change(table: &str, pk: &[u8], before: Option<Object>, after: Option<Object>) -> Change {
        Change {
            table: table.to_string(),
            before,
            after,
            primary_key: pk.to_vec(),
        }
    }

    #[test]
    fn test_distinct_identities_keep_order() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", None, Some(obj("a1"))));
        log.record(change("one", b"b", None, Some(obj("b1"))));
        log.record(change("two", b"a", None, Some(obj("a2"))));

        let got = log.changes();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].table, "one");
        assert_eq!(tag(got[0].after.as_ref().unwrap()), "a1");
        assert_eq!(got[2].table, "two");
    }

    #[test]
    fn test_second_write_updates_after_in_place() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", None, Some(obj("v1"))));
        log.record(change("one", b"a", Some(obj("v1")), Some(obj("v2"))));
        log.record(change("one", b"a", Some(obj("v2")), Some(obj("v3"))));

        let got = log.changes();
        assert_eq!(got.len(), 1);
        assert!(got[0].created());
        assert_eq!(tag(got[0].after.as_ref().unwrap()), "v3");
    }

    #[test]
    fn test_insert_then_delete_erases() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", None, Some(obj("v1"))));
        log.record(change("one", b"a", Some(obj("v1")), None));
        assert!(log.changes().is_empty());
    }

    #[test]
    fn test_update_then_delete_keeps_deletion() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", Some(obj("v0")), Some(obj("v1"))));
        log.record(change("one", b"a", Some(obj("v1")), None));

        let got = log.changes();
        assert_eq!(got.len(), 1);
        assert!(got[0].deleted());
        assert_eq!(tag(got[0].before.as_ref().unwrap()), "v0");
    }

    #[test]
    fn test_erased_slot_can_be_reused() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", None, Some(obj("v1"))));
        log.record(change("one", b"a", Some(obj("v1")), None));
        // The identity reappears after the erase: a fresh creation.
        log.record(change("one", b"a", None, Some(obj("v2"))));

        let got = log.changes();
        assert_eq!(got.len(), 1);
        assert!(got[0].created());
        assert_eq!(tag(got[0].after.as_ref().unwrap()), "v2");
    }

    #[test]
    fn test_same_key_different_tables_are_distinct() {
        let mut log = ChangeLog::new();
        log.record(change("one", b"a", None, Some(obj("x"))));
        log.record(change("two", b"a", Some(obj("x")), None));
        assert_eq!(log.changes().len(), 2);
    }
}
