//! The clipboard hub: one designated owner for the live connection set,
//! reached only through an ordered event queue.
//!
//! # Why a single consumer?
//!
//! For any two mutations the hub accepts, every connection must observe their
//! effects in the same relative order. Funnelling registration,
//! unregistration, and inbound mutations through one `mpsc` channel consumed
//! by one loop makes that total order fall out of the channel itself: the
//! loop is the only writer of the connection set and the only caller of
//! clipboard mutations that broadcast, so no lock on the set is needed and no
//! interleaving can reorder two broadcasts between observers.
//!
//! # Backpressure
//!
//! Broadcasts are enqueued per connection with a non-blocking send. A
//! connection whose outbound queue is full is removed from the set on the
//! spot (its queue sender drops, its write pump drains what is left and
//! closes the socket). Disconnect-on-overflow is the documented policy: a
//! stalled client never delays delivery to the healthy ones, and a client
//! that survives never holds a silently gapped view of the clipboard.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use sharebox_core::{ClientMessage, Clipboard, ServerMessage};

/// Unique identifier of one live connection, assigned at registration.
pub type ConnectionId = Uuid;

/// Capacity of the hub's own event queue. Submitting to a full queue awaits,
/// which slows only the submitting connection's read pump.
const HUB_EVENT_QUEUE: usize = 256;

/// Error returned when the hub's event loop is no longer running.
#[derive(Debug, Error)]
#[error("clipboard hub has stopped")]
pub struct HubStopped;

// ── Connection handle ─────────────────────────────────────────────────────────

/// The hub's view of one registered connection: its id and the sending side
/// of its bounded outbound queue. The write pump owns the receiving side.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, outbound }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// The ordered stream of events the hub consumes.
#[derive(Debug)]
pub enum HubEvent {
    /// A new connection finished its handshake; add it and send it the
    /// current snapshot.
    Register(ConnectionHandle),

    /// A connection's pumps terminated. Idempotent: unknown ids are a no-op.
    Unregister(ConnectionId),

    /// A parsed inbound message from a registered connection.
    Inbound {
        from: ConnectionId,
        message: ClientMessage,
    },

    /// Stop consuming events. Live connections are left to notice their
    /// queues closing; no forced disconnect is required.
    Shutdown,
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Cloneable sender half of the hub. This is the only way to reach the hub;
/// the connection layer and `main` never touch hub state directly.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
}

impl HubHandle {
    /// Registers a connection. The hub immediately enqueues a full snapshot
    /// to that connection only, so it starts consistent with everyone else.
    pub async fn register(&self, connection: ConnectionHandle) -> Result<(), HubStopped> {
        self.send(HubEvent::Register(connection)).await
    }

    /// Unregisters a connection. Safe to call more than once.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubStopped> {
        self.send(HubEvent::Unregister(id)).await
    }

    /// Submits an inbound mutation message for processing and broadcast.
    pub async fn submit(&self, from: ConnectionId, message: ClientMessage) -> Result<(), HubStopped> {
        self.send(HubEvent::Inbound { from, message }).await
    }

    /// Asks the hub to stop accepting events.
    pub async fn shutdown(&self) -> Result<(), HubStopped> {
        self.send(HubEvent::Shutdown).await
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubStopped> {
        self.events.send(event).await.map_err(|_| HubStopped)
    }
}

// ── Hub ───────────────────────────────────────────────────────────────────────

/// The hub itself. Constructed once at startup; [`run`] consumes it on its
/// own task for the process lifetime.
///
/// [`run`]: Hub::run
pub struct Hub {
    clipboard: Arc<Clipboard>,
    connections: HashMap<ConnectionId, ConnectionHandle>,
    events: mpsc::Receiver<HubEvent>,
}

impl Hub {
    /// Creates the hub and the handle used to reach it.
    pub fn new(clipboard: Arc<Clipboard>) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(HUB_EVENT_QUEUE);
        let hub = Self {
            clipboard,
            connections: HashMap::new(),
            events: rx,
        };
        (hub, HubHandle { events: tx })
    }

    /// Runs the event loop until a `Shutdown` event arrives or every handle
    /// has been dropped.
    pub async fn run(mut self) {
        info!("clipboard hub started");
        while let Some(event) = self.events.recv().await {
            match event {
                HubEvent::Register(connection) => self.register(connection),
                HubEvent::Unregister(id) => self.unregister(id),
                HubEvent::Inbound { from, message } => self.apply_and_broadcast(from, message),
                HubEvent::Shutdown => break,
            }
        }
        // Dropping the connection set closes every outbound queue; write
        // pumps drain what is left and close their sockets.
        info!(
            connections = self.connections.len(),
            "clipboard hub stopped"
        );
    }

    fn register(&mut self, connection: ConnectionHandle) {
        let id = connection.id();
        let snapshot = ServerMessage::Snapshot {
            entries: self.clipboard.list(),
        };
        // The snapshot is queued before the connection can receive any
        // broadcast, so a late joiner always starts from the same state the
        // existing connections already rendered.
        if let Err(e) = connection.outbound.try_send(snapshot) {
            warn!(%id, "dropping connection at registration: {e}");
            return;
        }
        self.connections.insert(id, connection);
        debug!(%id, total = self.connections.len(), "connection registered");
    }

    fn unregister(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            debug!(%id, total = self.connections.len(), "connection unregistered");
        } else {
            debug!(%id, "unregister for unknown connection ignored");
        }
    }

    fn apply_and_broadcast(&mut self, from: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::Add { content } => {
                let entry = self.clipboard.add(content);
                debug!(%from, id = %entry.id, "entry added");
                self.broadcast(ServerMessage::Add { entry });
            }
            ClientMessage::Remove { id } => {
                if self.clipboard.remove(id) {
                    debug!(%from, %id, "entry removed");
                    self.broadcast(ServerMessage::Remove { id });
                } else {
                    // Removing an id that no longer exists is a no-op, not an
                    // error, and nothing is broadcast.
                    debug!(%from, %id, "remove of unknown entry ignored");
                }
            }
        }
    }

    /// Enqueues `message` to every registered connection, including the
    /// originator of the mutation. Clients render from broadcasts, never
    /// from optimistic local state.
    fn broadcast(&mut self, message: ServerMessage) {
        let mut stalled: Vec<ConnectionId> = Vec::new();
        for (id, connection) in &self.connections {
            if connection.outbound.try_send(message.clone()).is_err() {
                stalled.push(*id);
            }
        }
        for id in stalled {
            warn!(%id, "outbound queue full or closed; disconnecting slow client");
            self.connections.remove(&id);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
