//! End-to-end clipboard sessions over real sockets.
//!
//! These start the actual accept loop on an ephemeral port and drive it with
//! tokio-tungstenite's client connector, covering the full path: handshake →
//! registration → snapshot → broadcast fan-out → malformed-frame handling.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use sharebox_core::{Clipboard, ServerMessage};
use sharebox_server::application::hub::Hub;
use sharebox_server::infrastructure::ws_server;

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts a hub plus accept loop on an ephemeral port.
async fn start_server(queue_capacity: usize) -> (SocketAddr, Arc<Clipboard>, Arc<AtomicBool>) {
    let clipboard = Arc::new(Clipboard::new());
    let (hub, handle) = Hub::new(Arc::clone(&clipboard));
    tokio::spawn(hub.run());

    let listener = ws_server::bind("127.0.0.1:0".parse().unwrap())
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let running = Arc::new(AtomicBool::new(true));
    tokio::spawn(ws_server::serve(
        listener,
        handle,
        queue_capacity,
        Arc::clone(&running),
    ));

    (addr, clipboard, running)
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _response) = connect_async(format!("ws://{addr}/"))
        .await
        .expect("client connect");
    ws
}

/// Receives the next protocol message, skipping WebSocket keepalive frames.
async fn recv_message(ws: &mut WsClient) -> ServerMessage {
    loop {
        let frame = timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("transport error");
        match frame {
            WsMessage::Text(text) => {
                return serde_json::from_str(&text).expect("server sent invalid protocol JSON")
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(WsMessage::Text(text.to_string()))
        .await
        .expect("client send");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_clients_observe_the_example_scenario_identically() {
    let (addr, clipboard, _running) = start_server(64).await;

    let mut c1 = connect(addr).await;
    let mut c2 = connect(addr).await;
    let mut c3 = connect(addr).await;

    // Each new client starts from the empty snapshot.
    for client in [&mut c1, &mut c2, &mut c3] {
        match recv_message(client).await {
            ServerMessage::Snapshot { entries } => assert!(entries.is_empty()),
            other => panic!("expected snapshot first, got {other:?}"),
        }
    }

    // C1 adds; everyone, C1 included, receives the identical entry.
    send_text(&mut c1, r#"{"kind":"add","content":"hello"}"#).await;
    let m1 = recv_message(&mut c1).await;
    let m2 = recv_message(&mut c2).await;
    let m3 = recv_message(&mut c3).await;
    assert_eq!(m1, m2);
    assert_eq!(m2, m3);
    let entry = match m1 {
        ServerMessage::Add { entry } => entry,
        other => panic!("expected add broadcast, got {other:?}"),
    };
    assert_eq!(entry.content, "hello");

    // C2 removes; everyone receives the remove notification.
    send_text(&mut c2, &format!(r#"{{"kind":"remove","id":{}}}"#, entry.id)).await;
    for client in [&mut c1, &mut c2, &mut c3] {
        match recv_message(client).await {
            ServerMessage::Remove { id } => assert_eq!(id, entry.id),
            other => panic!("expected remove broadcast, got {other:?}"),
        }
    }

    // The export confirms the clipboard emptied out.
    assert_eq!(clipboard.serialize().unwrap(), b"[]");
}

#[tokio::test]
async fn late_joiner_receives_the_current_entries_before_any_broadcast() {
    let (addr, _clipboard, _running) = start_server(64).await;

    let mut early = connect(addr).await;
    assert!(matches!(
        recv_message(&mut early).await,
        ServerMessage::Snapshot { .. }
    ));
    send_text(&mut early, r#"{"kind":"add","content":"first"}"#).await;
    send_text(&mut early, r#"{"kind":"add","content":"second"}"#).await;
    assert!(matches!(recv_message(&mut early).await, ServerMessage::Add { .. }));
    assert!(matches!(recv_message(&mut early).await, ServerMessage::Add { .. }));

    let mut late = connect(addr).await;
    match recv_message(&mut late).await {
        ServerMessage::Snapshot { entries } => {
            let contents: Vec<&str> = entries.iter().map(|e| e.content.as_str()).collect();
            assert_eq!(contents, vec!["first", "second"]);
        }
        other => panic!("expected snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_get_an_ack_error_and_leave_the_session_usable() {
    let (addr, clipboard, _running) = start_server(64).await;

    let mut offender = connect(addr).await;
    let mut bystander = connect(addr).await;
    assert!(matches!(
        recv_message(&mut offender).await,
        ServerMessage::Snapshot { .. }
    ));
    assert!(matches!(
        recv_message(&mut bystander).await,
        ServerMessage::Snapshot { .. }
    ));

    // Three flavours of malformed input, each answered with ack-error.
    send_text(&mut offender, "not json at all").await;
    assert!(matches!(
        recv_message(&mut offender).await,
        ServerMessage::AckError { .. }
    ));

    send_text(&mut offender, r#"{"kind":"shout","content":"hey"}"#).await;
    assert!(matches!(
        recv_message(&mut offender).await,
        ServerMessage::AckError { .. }
    ));

    offender
        .send(WsMessage::Binary(vec![0xde, 0xad, 0xbe, 0xef]))
        .await
        .expect("send binary");
    assert!(matches!(
        recv_message(&mut offender).await,
        ServerMessage::AckError { .. }
    ));

    // The clipboard was never touched.
    assert!(clipboard.is_empty());

    // The offending connection remains usable, and the bystander's very next
    // message is the valid broadcast; it never saw any of the rejects.
    send_text(&mut offender, r#"{"kind":"add","content":"recovered"}"#).await;
    match recv_message(&mut bystander).await {
        ServerMessage::Add { entry } => assert_eq!(entry.content, "recovered"),
        other => panic!("bystander must only see the valid add, got {other:?}"),
    }
    assert!(matches!(
        recv_message(&mut offender).await,
        ServerMessage::Add { .. }
    ));
}

#[tokio::test]
async fn disconnecting_a_client_leaves_the_others_working() {
    let (addr, _clipboard, _running) = start_server(64).await;

    let mut leaver = connect(addr).await;
    let mut stayer = connect(addr).await;
    assert!(matches!(
        recv_message(&mut leaver).await,
        ServerMessage::Snapshot { .. }
    ));
    assert!(matches!(
        recv_message(&mut stayer).await,
        ServerMessage::Snapshot { .. }
    ));

    leaver.close(None).await.expect("close");
    // Give the server a moment to process the close and unregister.
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_text(&mut stayer, r#"{"kind":"add","content":"still alive"}"#).await;
    match recv_message(&mut stayer).await {
        ServerMessage::Add { entry } => assert_eq!(entry.content, "still alive"),
        other => panic!("expected add broadcast, got {other:?}"),
    }
}

#[tokio::test]
async fn clearing_the_running_flag_stops_new_connections() {
    let (addr, _clipboard, running) = start_server(64).await;

    // A connection made while running works.
    let mut before = connect(addr).await;
    assert!(matches!(
        recv_message(&mut before).await,
        ServerMessage::Snapshot { .. }
    ));

    running.store(false, Ordering::Relaxed);
    // The accept loop polls the flag at 200 ms; give it time to exit and
    // release the listener.
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(
        connect_async(format!("ws://{addr}/")).await.is_err(),
        "new connections must be refused after shutdown"
    );
}
