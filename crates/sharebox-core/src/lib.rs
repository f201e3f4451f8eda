//! # sharebox-core
//!
//! Shared library for Sharebox containing the clipboard state and the JSON
//! wire protocol spoken over each clipboard WebSocket connection.
//!
//! This crate is used by the server binary and by external clients that want
//! to speak the protocol natively. It has zero dependencies on sockets, async
//! runtimes, or HTTP frameworks.
//!
//! - **`clipboard`** – The shared ordered collection of text entries visible
//!   to all connected clients, with internally synchronized mutation and a
//!   JSON export suitable for direct download.
//!
//! - **`protocol`** – The message envelopes exchanged over a connection.
//!   Every message is a JSON object with a `"kind"` discriminant; inbound and
//!   outbound messages are distinct types so a direction mix-up is a compile
//!   error.

pub mod clipboard;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `sharebox_core::Clipboard` instead of `sharebox_core::clipboard::store::Clipboard`.
pub use clipboard::entry::{ClipboardEntry, EntryId};
pub use clipboard::store::{Clipboard, ExportError};
pub use protocol::messages::{ClientMessage, ProtocolError, ServerMessage};
