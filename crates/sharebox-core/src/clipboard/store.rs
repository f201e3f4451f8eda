//! The synchronized clipboard store.
//!
//! # Ordering
//!
//! Entries are kept **oldest first** (insertion order), fixed. Snapshots,
//! change broadcasts, and the export all present the same order.
//!
//! # Synchronization
//!
//! All four operations lock the internal mutex for the duration of the call.
//! Critical sections are short (no I/O, no allocation beyond the entry or
//! snapshot being built), so a plain `std::sync::Mutex` is used rather than an
//! async lock: the export route must be callable from outside the hub loop,
//! including from non-async contexts in tests. An entry returned by [`add`]
//! is always fully constructed before it becomes observable.
//!
//! [`add`]: Clipboard::add

use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use super::entry::{unix_millis, ClipboardEntry, EntryId};
use super::sequence::EntryIdCounter;

/// Error type for the clipboard export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The entry list could not be serialized to JSON.
    #[error("failed to serialize clipboard export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The shared ordered collection of clipboard entries.
///
/// Created once at server start (empty), shared via `Arc`, and discarded on
/// shutdown. Entry ids within the store are unique at any instant, and,
/// because ids are allocated from a process-wide counter, across the whole
/// process lifetime.
pub struct Clipboard {
    entries: Mutex<Vec<ClipboardEntry>>,
    ids: EntryIdCounter,
}

impl Clipboard {
    /// Creates an empty clipboard.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ids: EntryIdCounter::new(),
        }
    }

    /// Appends a new entry with a fresh id and the current timestamp.
    ///
    /// Returns a copy of the entry exactly as every client will see it.
    pub fn add(&self, content: impl Into<String>) -> ClipboardEntry {
        let entry = ClipboardEntry {
            id: self.ids.next(),
            content: content.into(),
            created_at: unix_millis(),
        };

        let mut entries = self.entries.lock().expect("clipboard lock poisoned");
        entries.push(entry.clone());
        debug!(id = %entry.id, total = entries.len(), "clipboard entry added");
        entry
    }

    /// Removes the entry with the given id, if present.
    ///
    /// Returns whether anything was removed. Removing an unknown id is a
    /// no-op, not an error.
    pub fn remove(&self, id: EntryId) -> bool {
        let mut entries = self.entries.lock().expect("clipboard lock poisoned");
        match entries.iter().position(|e| e.id == id) {
            Some(index) => {
                entries.remove(index);
                debug!(%id, total = entries.len(), "clipboard entry removed");
                true
            }
            None => false,
        }
    }

    /// Returns a snapshot copy of all entries, oldest first.
    ///
    /// The snapshot is detached: later mutations do not affect it.
    pub fn list(&self) -> Vec<ClipboardEntry> {
        self.entries.lock().expect("clipboard lock poisoned").clone()
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("clipboard lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the current entry list as a pretty-printed JSON document,
    /// suitable for direct download as a file.
    ///
    /// This is a pure function of the current state: two calls without an
    /// intervening mutation produce byte-identical output. The export embeds
    /// no generation timestamp; the download route puts the timestamp in the
    /// filename instead.
    pub fn serialize(&self) -> Result<Vec<u8>, ExportError> {
        let entries = self.list();
        Ok(serde_json::to_vec_pretty(&entries)?)
    }
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
