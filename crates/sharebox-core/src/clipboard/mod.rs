//! The shared clipboard: entry types, id allocation, and the synchronized
//! store.
//!
//! The clipboard is the one piece of state shared across every connection.
//! It lives for the process lifetime, starts empty, and is never persisted;
//! the only externally visible artifact is the on-demand JSON export.
//!
//! All mutation goes through [`store::Clipboard`]'s own synchronized
//! operations. The hub is the only caller whose mutations result in a
//! broadcast; the export route reads concurrently without coordinating with
//! the hub loop.

pub mod entry;
pub mod sequence;
pub mod store;

pub use entry::{ClipboardEntry, EntryId};
pub use store::{Clipboard, ExportError};
