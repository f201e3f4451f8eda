//! Lock-free allocation of clipboard entry ids.
//!
//! Every entry id must be unique for the lifetime of the process; ids are
//! never reused, even after the entry they named is removed. An `AtomicU64`
//! gives that guarantee without a lock: `fetch_add` reads, increments, and
//! writes as one indivisible step, so concurrent callers can never observe
//! the same value twice.

use std::sync::atomic::{AtomicU64, Ordering};

use super::entry::EntryId;

/// A thread-safe, monotonically increasing allocator of [`EntryId`]s.
///
/// The first allocated id is 1, so 0 never names a live entry.
pub struct EntryIdCounter {
    inner: AtomicU64,
}

impl EntryIdCounter {
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(1),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// `Relaxed` ordering suffices: ids are only required to be unique, not
    /// to synchronize any other memory.
    pub fn next(&self) -> EntryId {
        EntryId::new(self.inner.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for EntryIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
