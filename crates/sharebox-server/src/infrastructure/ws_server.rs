//! Clipboard WebSocket accept loop.
//!
//! Binding and serving are separate so integration tests can bind port 0,
//! read back the assigned address, and then drive the same loop the binary
//! uses.
//!
//! The accept call carries a short timeout so the loop can notice the
//! shutdown flag even when no clients are connecting. Each accepted
//! connection is handed to its own task immediately; the loop itself never
//! performs session I/O, so one slow handshake cannot delay the next client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::application::hub::HubHandle;
use crate::infrastructure::connection::handle_connection;

/// How long one `accept` waits before the loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Binds the clipboard listener.
///
/// # Errors
///
/// Returns an error if the address cannot be bound (port in use, missing
/// permission).
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind clipboard WebSocket listener on {addr}"))?;
    info!("clipboard WebSocket listener on {addr}");
    Ok(listener)
}

/// Accepts clipboard connections until `running` is cleared, spawning one
/// session task per connection.
pub async fn serve(
    listener: TcpListener,
    hub: HubHandle,
    queue_capacity: usize,
    running: Arc<AtomicBool>,
) {
    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping clipboard accept loop");
            break;
        }

        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new clipboard connection from {peer_addr}");
                let hub = hub.clone();
                tokio::spawn(async move {
                    handle_connection(stream, peer_addr, hub, queue_capacity).await;
                });
            }
            Ok(Err(e)) => {
                // Transient accept failure (e.g. file-descriptor pressure);
                // keep serving the clients we can.
                error!("accept error on clipboard listener: {e}");
            }
            Err(_) => {
                // Timeout: no connection attempt, re-check the flag.
            }
        }
    }
}
