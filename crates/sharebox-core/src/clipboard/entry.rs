//! Clipboard entry types.
//!
//! Entries are immutable once created: "editing" an entry is modeled as a
//! remove followed by an add, which yields a fresh id. Ids are opaque to
//! clients; they are only ever echoed back in `remove` requests.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a clipboard entry.
///
/// Allocated once at entry creation and never reused for the lifetime of the
/// process. Serializes as a bare integer in the wire protocol and the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(u64);

impl EntryId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One clipboard entry as seen by every connected client.
///
/// The same shape is used in snapshot messages, change broadcasts, and the
/// JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipboardEntry {
    /// Unique id, assigned at creation, never reused.
    pub id: EntryId,
    /// The text payload. No size cap is enforced at this layer.
    pub content: String,
    /// Creation time in Unix milliseconds.
    pub created_at: u64,
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Tests ─────────────────────────────────────────────────────────────────────
