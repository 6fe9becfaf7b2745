// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! One-shot change notifiers and watch sets.
//!
//! Every trie node owns a [`Notify`]; when a published root supersedes the
//! node, the notifier is closed and stays closed forever. A [`WatchHandle`]
//! is a cheap clone of that notifier that callers collect into a
//! [`WatchSet`] to block until any observed part of the database changes.
//!
//! # Key Concepts
//!
//! "Fired" is modeled as channel disconnection: a notifier holds the sole
//! sender of a zero-capacity channel and closing drops it. Receivers are
//! always ready once the sender is gone, so a handle added after the fact
//! still wakes its watcher immediately.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;

/// A one-shot broadcast notifier.
///
/// Created open; [`Notify::close`] fires it exactly once. Cloned receivers
/// observe the close no matter when they subscribe.
pub(crate) struct Notify {
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Notify {
    pub(crate) fn new() -> Arc<Self> {
        let (tx, rx) = bounded(0);
        Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            rx,
        })
    }

    /// Fires the notifier. Idempotent.
    pub(crate) fn close(&self) {
        self.tx.lock().take();
    }
}

/// A subscription to a single [`Notify`].
///
/// Handles compare equal when they watch the same notifier, so a
/// [`WatchSet`] de-duplicates repeated observations of one trie node.
#[derive(Clone)]
pub struct WatchHandle {
    notify: Arc<Notify>,
}

impl WatchHandle {
    pub(crate) fn new(notify: Arc<Notify>) -> Self {
        Self { notify }
    }

    /// Returns true if the watched notifier has already fired.
    pub fn has_fired(&self) -> bool {
        matches!(self.notify.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn receiver(&self) -> &Receiver<()> {
        &self.notify.rx
    }
}

impl PartialEq for WatchHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.notify, &other.notify)
    }
}

impl Eq for WatchHandle {}

impl Hash for WatchHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.notify) as usize).hash(state);
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("fired", &self.has_fired())
            .finish()
    }
}

/// An unordered set of watch handles that can be waited on together.
#[derive(Default)]
pub struct WatchSet {
    handles: HashSet<WatchHandle>,
}

impl WatchSet {
    /// Constructs an empty watch set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handle to the set.
    pub fn add(&mut self, handle: WatchHandle) {
        self.handles.insert(handle);
    }

    /// Adds `handle` unless the set already holds `limit` handles, in which
    /// case `fallback` is added instead.
    ///
    /// Used to cap watcher counts on wide range scans: past the limit the
    /// caller watches a coarser fallback (typically the scanned subtree
    /// root) rather than every visited slice.
    pub fn add_with_limit(&mut self, limit: usize, handle: WatchHandle, fallback: WatchHandle) {
        if self.handles.len() < limit {
            self.handles.insert(handle);
        } else {
            self.handles.insert(fallback);
        }
    }

    /// Returns the number of distinct handles in the set.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if no handles have been added.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Blocks until any handle fires or the timeout elapses.
    ///
    /// Returns true on timeout, false if a handle fired. An empty set always
    /// times out.
    pub fn watch(&self, timeout: Duration) -> bool {
        if self.handles.is_empty() {
            std::thread::sleep(timeout);
            return true;
        }
        let mut select = Select::new();
        for handle in &self.handles {
            select.recv(handle.receiver());
        }
        select.ready_timeout(timeout).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds a set of `size` handles, fires the one at `fire` (or none for
    // a negative index), and checks the watch outcome.
    fn run_watch(size: usize, fire: Option<usize>) {
        let mut ws = WatchSet::new();
        let mut notifies = Vec::new();
        for i in 0..size {
            let n = Notify::new();
            ws.add(WatchHandle::new(n.clone()));
            if fire == Some(i) {
                n.close();
            }
            notifies.push(n);
        }

        let timed_out = ws.watch(Duration::from_millis(10));
        assert_eq!(timed_out, fire.is_none(), "size={size} fire={fire:?}");
    }

    #[test]
    fn test_watch_any_size_any_slot() {
        for size in 0..24 {
            for fire in 0..size {
                run_watch(size, Some(fire));
            }
            run_watch(size, None);
        }
    }

    #[test]
    fn test_watch_empty_times_out() {
        let ws = WatchSet::new();
        assert!(ws.watch(Duration::from_millis(1)));
    }

    #[test]
    fn test_handle_fires_after_add() {
        let n = Notify::new();
        let mut ws = WatchSet::new();
        ws.add(WatchHandle::new(n.clone()));

        // Fire after the handle is already in the set.
        n.close();
        assert!(!ws.watch(Duration::from_secs(1)));
        assert!(WatchHandle::new(n).has_fired());
    }

    #[test]
    fn test_close_is_idempotent() {
        let n = Notify::new();
        n.close();
        n.close();
        assert!(WatchHandle::new(n).has_fired());
    }

    #[test]
    fn test_duplicate_handles_dedup() {
        let n = Notify::new();
        let mut ws = WatchSet::new();
        ws.add(WatchHandle::new(n.clone()));
        ws.add(WatchHandle::new(n.clone()));
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn test_add_with_limit_in() {
        let in_n = Notify::new();
        let alt_n = Notify::new();
        let nope_n = Notify::new();

        let mut ws = WatchSet::new();
        ws.add_with_limit(1, WatchHandle::new(in_n.clone()), WatchHandle::new(alt_n.clone()));
        ws.add_with_limit(1, WatchHandle::new(nope_n.clone()), WatchHandle::new(alt_n.clone()));

        // The first handle made it in under the limit.
        in_n.close();
        assert!(!ws.watch(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_with_limit_fallback() {
        let in_n = Notify::new();
        let alt_n = Notify::new();
        let nope_n = Notify::new();

        let mut ws = WatchSet::new();
        ws.add_with_limit(1, WatchHandle::new(in_n.clone()), WatchHandle::new(alt_n.clone()));
        ws.add_with_limit(1, WatchHandle::new(nope_n.clone()), WatchHandle::new(alt_n.clone()));

        // The fallback was added once the limit was hit.
        alt_n.close();
        assert!(!ws.watch(Duration::from_secs(1)));
    }

    #[test]
    fn test_add_with_limit_overflow_not_added() {
        let in_n = Notify::new();
        let alt_n = Notify::new();
        let nope_n = Notify::new();

        let mut ws = WatchSet::new();
        ws.add_with_limit(1, WatchHandle::new(in_n.clone()), WatchHandle::new(alt_n.clone()));
        ws.add_with_limit(1, WatchHandle::new(nope_n.clone()), WatchHandle::new(alt_n.clone()));

        // The over-limit handle was never added, so firing it changes nothing.
        nope_n.close();
        assert!(ws.watch(Duration::from_millis(10)));
    }

    #[test]
    fn test_watch_from_other_thread() {
        let n = Notify::new();
        let mut ws = WatchSet::new();
        ws.add(WatchHandle::new(n.clone()));

        let t = std::thread::spawn(move || ws.watch(Duration::from_secs(5)));
        n.close();
        assert!(!t.join().unwrap());
    }
}
