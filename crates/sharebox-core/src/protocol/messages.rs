//! Message envelopes for the clipboard protocol.
//!
//! # Wire format
//!
//! ```json
//! {"kind":"add","content":"hello"}
//! {"kind":"remove","id":3}
//! {"kind":"snapshot","entries":[{"id":1,"content":"…","created_at":1700000000000}]}
//! {"kind":"ack-error","reason":"unknown kind"}
//! ```
//!
//! Serde's `#[serde(tag = "kind")]` attribute maps the discriminant field;
//! `rename_all = "kebab-case"` yields the lowercase kind names, including
//! `ack-error`.
//!
//! # Why two enums?
//!
//! Inbound and outbound traffic carry different information: clients send
//! mutation *requests* (`add` with content, `remove` with an id), the server
//! sends authoritative *state* (a full snapshot, or the change that was
//! applied). Distinct types make sending a direction-inappropriate message a
//! compile-time error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clipboard::entry::{ClipboardEntry, EntryId};

/// Errors produced while encoding or decoding protocol messages.
///
/// A `Malformed` error covers every rejection the read pump cares about:
/// invalid JSON, an unknown `kind`, or a missing required field.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

// ── Client → server messages ──────────────────────────────────────────────────

/// All messages a client may send over its connection.
///
/// Each is a request for a clipboard mutation; the authoritative result comes
/// back as a [`ServerMessage`] broadcast to every connection, including the
/// sender's own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Request a new entry holding `content`.
    Add { content: String },

    /// Request removal of the entry named by `id`.
    ///
    /// Removing an id that no longer exists is a silent no-op on the server.
    Remove { id: EntryId },
}

impl ClientMessage {
    /// Parses an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Malformed`] for invalid JSON, an unknown
    /// `kind`, or a missing field.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Malformed)
    }
}

// ── Server → client messages ──────────────────────────────────────────────────

/// All messages the server may send to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// The full ordered entry list, sent once to each newly registered
    /// connection so it starts consistent with everyone else.
    Snapshot { entries: Vec<ClipboardEntry> },

    /// An entry was added. Carries the entry exactly as created, so every
    /// client renders the same id, content, and timestamp.
    Add { entry: ClipboardEntry },

    /// The entry named by `id` was removed.
    Remove { id: EntryId },

    /// The previous inbound frame from this client was rejected. The
    /// clipboard and all other connections are unaffected.
    AckError { reason: String },
}

impl ServerMessage {
    /// Encodes this message as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
