//! The JSON wire protocol spoken over each clipboard connection.
//!
//! Every message is a JSON text frame carrying an object with a `"kind"`
//! discriminant. Inbound and outbound messages are separate types: a client
//! only ever sends mutation requests, and the server only ever sends
//! authoritative state (snapshots and change broadcasts). Clients render from
//! broadcasts alone; there is no optimistic local state to reconcile.

pub mod messages;

pub use messages::{ClientMessage, ProtocolError, ServerMessage};
