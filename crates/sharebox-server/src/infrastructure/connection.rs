//! One client's clipboard session: the WebSocket handshake, hub
//! registration, and the two pumps.
//!
//! Two execution contexts cooperate over each session:
//!
//! - The **write pump** (its own task) drains the connection's bounded
//!   outbound queue in FIFO order and writes JSON text frames. It ends when
//!   the queue closes (the session wound down, or the hub dropped this
//!   connection as too slow) or when a write fails.
//! - The **read pump** (this task) receives frames until the transport
//!   closes or fails. Valid messages are forwarded to the hub; malformed
//!   frames are answered with a best-effort `ack-error` and otherwise
//!   dropped, leaving the connection usable.
//!
//! Either pump's termination triggers unregistration as a follow-up event on
//! the hub's queue, never an inline mutation of the hub's set.
//!
//! The sink half of the socket is shared behind an async mutex: the write
//! pump holds it per message, and the read pump borrows it briefly to send
//! `ack-error` replies without going through the outbound queue.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage, WebSocketStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sharebox_core::{ClientMessage, ServerMessage};

use crate::application::hub::{ConnectionHandle, ConnectionId, HubHandle};

type WsSink = Arc<Mutex<SplitSink<WebSocketStream<TcpStream>, WsMessage>>>;

/// Top-level handler for a single clipboard session; entry point of each
/// per-session task spawned by the accept loop.
///
/// Wraps [`run_session`] so `?` can be used for error propagation inside
/// while the outcome is logged here.
pub async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: HubHandle,
    queue_capacity: usize,
) {
    match run_session(stream, peer_addr, hub, queue_capacity).await {
        Ok(()) => info!("clipboard session {peer_addr} closed"),
        Err(e) => warn!("clipboard session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one clipboard session.
///
/// # Errors
///
/// Returns an error if the WebSocket handshake fails or the hub is no longer
/// accepting registrations.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: HubHandle,
    queue_capacity: usize,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let id: ConnectionId = Uuid::new_v4();
    info!("clipboard session established: {peer_addr} as {id}");

    // The hub holds the only long-lived sender for this queue. When the hub
    // drops the handle (unregistration or disconnect-on-overflow), the write
    // pump sees the queue close and winds the socket down.
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerMessage>(queue_capacity);
    hub.register(ConnectionHandle::new(id, outbound_tx))
        .await
        .context("hub is not accepting connections")?;

    let (ws_tx, ws_rx) = ws_stream.split();
    let sink: WsSink = Arc::new(Mutex::new(ws_tx));

    let write_task = tokio::spawn(write_pump(id, Arc::clone(&sink), outbound_rx));

    read_pump(id, &hub, &sink, ws_rx).await;

    // Follow-up event, idempotent: the hub may already have dropped us. Once
    // it does, the queue closes and the write pump winds down.
    let _ = hub.unregister(id).await;
    let _ = write_task.await;
    Ok(())
}

/// Drains the outbound queue and writes each message as a JSON text frame,
/// FIFO. Closes the socket when the queue closes or a write fails.
async fn write_pump(id: ConnectionId, sink: WsSink, mut outbound_rx: mpsc::Receiver<ServerMessage>) {
    while let Some(message) = outbound_rx.recv().await {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("connection {id}: failed to encode outbound message: {e}");
                continue;
            }
        };
        let mut sink = sink.lock().await;
        if sink.send(WsMessage::Text(text)).await.is_err() {
            debug!("connection {id}: write failed, client gone");
            break;
        }
    }
    let mut sink = sink.lock().await;
    let _ = sink.close().await;
}

/// Receives frames until the transport closes or errors, forwarding valid
/// messages to the hub.
async fn read_pump(
    id: ConnectionId,
    hub: &HubHandle,
    sink: &WsSink,
    mut ws_rx: SplitStream<WebSocketStream<TcpStream>>,
) {
    while let Some(frame) = ws_rx.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => match ClientMessage::from_json(&text) {
                Ok(message) => {
                    if hub.submit(id, message).await.is_err() {
                        debug!("connection {id}: hub stopped, ending session");
                        break;
                    }
                }
                Err(e) => {
                    // Rejected locally: the clipboard and every other
                    // connection are untouched.
                    warn!("connection {id}: malformed frame rejected: {e}");
                    send_ack_error(id, sink, e.to_string()).await;
                }
            },
            Ok(WsMessage::Binary(_)) => {
                warn!("connection {id}: binary frame rejected");
                send_ack_error(id, sink, "binary frames are not part of the protocol".into()).await;
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // Protocol-level keepalive; tungstenite queues the pong reply
                // itself on the next write.
            }
            Ok(WsMessage::Close(_)) => {
                debug!("connection {id}: close frame received");
                break;
            }
            Ok(WsMessage::Frame(_)) => {
                debug!("connection {id}: raw frame ignored");
            }
            Err(e) => {
                debug!("connection {id}: transport error: {e}");
                break;
            }
        }
    }
}

/// Best-effort `ack-error` reply, written directly to the sink rather than
/// the outbound queue so a rejection cannot evict broadcast traffic.
async fn send_ack_error(id: ConnectionId, sink: &WsSink, reason: String) {
    let message = ServerMessage::AckError { reason };
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            error!("connection {id}: failed to encode ack-error: {e}");
            return;
        }
    };
    let mut sink = sink.lock().await;
    if sink.send(WsMessage::Text(text)).await.is_err() {
        debug!("connection {id}: ack-error not delivered, client gone");
    }
}
