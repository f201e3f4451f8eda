//! Application layer: the clipboard hub.
//!
//! The hub is the single serialization point for all shared state. Everything
//! that touches the live connection set (registration, unregistration, and
//! every broadcast decision) happens on the hub's own event loop, one event
//! at a time, which is what gives every client an identical view of the order
//! of clipboard mutations.

pub mod hub;

pub use hub::{ConnectionHandle, ConnectionId, Hub, HubEvent, HubHandle, HubStopped};
