//! Integration tests for the clipboard hub through its public API.
//!
//! These exercise the hub the same way the connection layer does: fake
//! connections are just bounded channels registered via `HubHandle`, so the
//! properties that matter (one total order of mutations observed identically
//! by every connection, snapshot consistency for late joiners, idempotent
//! removes, and isolation from slow consumers) can be asserted without any
//! sockets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver};
use tokio::time::timeout;
use uuid::Uuid;

use sharebox_core::{ClientMessage, Clipboard, EntryId, ServerMessage};
use sharebox_server::application::hub::{ConnectionHandle, ConnectionId, Hub, HubHandle};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn spawn_hub() -> (HubHandle, Arc<Clipboard>) {
    let clipboard = Arc::new(Clipboard::new());
    let (hub, handle) = Hub::new(Arc::clone(&clipboard));
    tokio::spawn(hub.run());
    (handle, clipboard)
}

async fn join(handle: &HubHandle, capacity: usize) -> (ConnectionId, Receiver<ServerMessage>) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(capacity);
    handle
        .register(ConnectionHandle::new(id, tx))
        .await
        .expect("hub running");
    (id, rx)
}

async fn recv(rx: &mut Receiver<ServerMessage>) -> ServerMessage {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("queue closed unexpectedly")
}

async fn recv_snapshot(rx: &mut Receiver<ServerMessage>) -> Vec<sharebox_core::ClipboardEntry> {
    match recv(rx).await {
        ServerMessage::Snapshot { entries } => entries,
        other => panic!("expected snapshot, got {other:?}"),
    }
}

/// Collects `count` broadcasts and reduces each to a comparable tag.
async fn collect_tags(rx: &mut Receiver<ServerMessage>, count: usize) -> Vec<String> {
    let mut tags = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = match recv(rx).await {
            ServerMessage::Add { entry } => format!("add:{}", entry.id),
            ServerMessage::Remove { id } => format!("remove:{id}"),
            other => panic!("unexpected message: {other:?}"),
        };
        tags.push(tag);
    }
    tags
}

// ── Total order ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_submissions_are_observed_in_one_identical_order() {
    let (handle, _clipboard) = spawn_hub();

    let (id_a, mut rx_a) = join(&handle, 256).await;
    let (id_b, mut rx_b) = join(&handle, 256).await;
    let (_id_c, mut rx_c) = join(&handle, 256).await;
    recv_snapshot(&mut rx_a).await;
    recv_snapshot(&mut rx_b).await;
    recv_snapshot(&mut rx_c).await;

    // Two submitters race 25 adds each.
    let submitter_a = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for i in 0..25 {
                handle
                    .submit(
                        id_a,
                        ClientMessage::Add {
                            content: format!("a-{i}"),
                        },
                    )
                    .await
                    .expect("hub running");
            }
        })
    };
    let submitter_b = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for i in 0..25 {
                handle
                    .submit(
                        id_b,
                        ClientMessage::Add {
                            content: format!("b-{i}"),
                        },
                    )
                    .await
                    .expect("hub running");
            }
        })
    };
    submitter_a.await.unwrap();
    submitter_b.await.unwrap();

    let order_a = collect_tags(&mut rx_a, 50).await;
    let order_b = collect_tags(&mut rx_b, 50).await;
    let order_c = collect_tags(&mut rx_c, 50).await;

    assert_eq!(order_a, order_b, "A and B must observe the same order");
    assert_eq!(order_b, order_c, "B and C must observe the same order");
}

#[tokio::test]
async fn mixed_adds_and_removes_keep_one_total_order() {
    let (handle, clipboard) = spawn_hub();

    let (id_a, mut rx_a) = join(&handle, 256).await;
    let (id_b, mut rx_b) = join(&handle, 256).await;
    recv_snapshot(&mut rx_a).await;
    recv_snapshot(&mut rx_b).await;

    // Seed entries to remove, observed by both connections.
    let mut seeded: Vec<EntryId> = Vec::new();
    for i in 0..10 {
        handle
            .submit(
                id_a,
                ClientMessage::Add {
                    content: format!("seed-{i}"),
                },
            )
            .await
            .unwrap();
    }
    for _ in 0..10 {
        match recv(&mut rx_a).await {
            ServerMessage::Add { entry } => seeded.push(entry.id),
            other => panic!("unexpected: {other:?}"),
        }
        recv(&mut rx_b).await;
    }

    // One task removes the seeds while the other adds fresh entries.
    let remover = {
        let handle = handle.clone();
        let seeded = seeded.clone();
        tokio::spawn(async move {
            for id in seeded {
                handle
                    .submit(id_a, ClientMessage::Remove { id })
                    .await
                    .unwrap();
            }
        })
    };
    let adder = {
        let handle = handle.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                handle
                    .submit(
                        id_b,
                        ClientMessage::Add {
                            content: format!("fresh-{i}"),
                        },
                    )
                    .await
                    .unwrap();
            }
        })
    };
    remover.await.unwrap();
    adder.await.unwrap();

    // 10 removes + 10 adds, in one identical order for both observers.
    let order_a = collect_tags(&mut rx_a, 20).await;
    let order_b = collect_tags(&mut rx_b, 20).await;
    assert_eq!(order_a, order_b);

    // The clipboard holds exactly the 10 fresh entries.
    assert_eq!(clipboard.len(), 10);
}

// ── Snapshot consistency ──────────────────────────────────────────────────────

#[tokio::test]
async fn late_joiner_snapshot_lists_exactly_the_entries_present() {
    let (handle, _clipboard) = spawn_hub();

    let (early_id, mut early_rx) = join(&handle, 64).await;
    recv_snapshot(&mut early_rx).await;

    for i in 0..3 {
        handle
            .submit(
                early_id,
                ClientMessage::Add {
                    content: format!("existing-{i}"),
                },
            )
            .await
            .unwrap();
    }
    // Wait until the third broadcast lands so the adds are fully applied.
    collect_tags(&mut early_rx, 3).await;

    let (_late_id, mut late_rx) = join(&handle, 64).await;
    let snapshot = recv_snapshot(&mut late_rx).await;

    let contents: Vec<&str> = snapshot.iter().map(|e| e.content.as_str()).collect();
    assert_eq!(contents, vec!["existing-0", "existing-1", "existing-2"]);
}

#[tokio::test]
async fn snapshot_always_precedes_broadcasts_for_a_new_connection() {
    let (handle, _clipboard) = spawn_hub();
    let (talker_id, mut talker_rx) = join(&handle, 64).await;
    recv_snapshot(&mut talker_rx).await;

    // Register a new connection and immediately submit a mutation: the
    // hub processes events in order, so the newcomer's first message must
    // still be the snapshot.
    let (_new_id, mut new_rx) = join(&handle, 64).await;
    handle
        .submit(
            talker_id,
            ClientMessage::Add {
                content: "racing".to_string(),
            },
        )
        .await
        .unwrap();

    assert!(matches!(recv(&mut new_rx).await, ServerMessage::Snapshot { .. }));
    assert!(matches!(recv(&mut new_rx).await, ServerMessage::Add { .. }));
}

// ── The §8-style end-to-end scenario ──────────────────────────────────────────

#[tokio::test]
async fn add_then_remove_is_seen_by_all_and_leaves_an_empty_export() {
    let (handle, clipboard) = spawn_hub();

    let (c1, mut rx1) = join(&handle, 64).await;
    let (c2, mut rx2) = join(&handle, 64).await;
    let (_c3, mut rx3) = join(&handle, 64).await;
    assert!(recv_snapshot(&mut rx1).await.is_empty());
    assert!(recv_snapshot(&mut rx2).await.is_empty());
    assert!(recv_snapshot(&mut rx3).await.is_empty());

    handle
        .submit(
            c1,
            ClientMessage::Add {
                content: "hello".to_string(),
            },
        )
        .await
        .unwrap();

    // Every connection receives the identical entry.
    let m1 = recv(&mut rx1).await;
    let m2 = recv(&mut rx2).await;
    let m3 = recv(&mut rx3).await;
    assert_eq!(m1, m2);
    assert_eq!(m2, m3);
    let entry = match m1 {
        ServerMessage::Add { entry } => entry,
        other => panic!("expected add, got {other:?}"),
    };
    assert_eq!(entry.content, "hello");

    handle
        .submit(c2, ClientMessage::Remove { id: entry.id })
        .await
        .unwrap();

    for rx in [&mut rx1, &mut rx2, &mut rx3] {
        match recv(rx).await {
            ServerMessage::Remove { id } => assert_eq!(id, entry.id),
            other => panic!("expected remove, got {other:?}"),
        }
    }

    assert_eq!(clipboard.serialize().unwrap(), b"[]");
}

// ── Backpressure isolation ────────────────────────────────────────────────────

#[tokio::test]
async fn stalled_connection_does_not_delay_healthy_ones() {
    let (handle, _clipboard) = spawn_hub();

    // The stalled connection's queue holds only its snapshot and is never
    // drained.
    let (_stalled_id, mut stalled_rx) = join(&handle, 1).await;
    let (healthy_id, mut healthy_rx) = join(&handle, 256).await;
    recv_snapshot(&mut healthy_rx).await;

    for i in 0..20 {
        handle
            .submit(
                healthy_id,
                ClientMessage::Add {
                    content: format!("burst-{i}"),
                },
            )
            .await
            .unwrap();
    }

    // All 20 broadcasts arrive at the healthy connection within the bounded
    // receive timeout.
    let tags = collect_tags(&mut healthy_rx, 20).await;
    assert_eq!(tags.len(), 20);

    // The stalled connection was disconnected rather than waited on: after
    // its buffered snapshot, its queue just closes.
    assert!(matches!(
        recv(&mut stalled_rx).await,
        ServerMessage::Snapshot { .. }
    ));
    assert!(
        timeout(RECV_TIMEOUT, stalled_rx.recv())
            .await
            .expect("queue should close promptly")
            .is_none(),
        "hub must drop its handle to the stalled connection"
    );
}

// ── Idempotent remove ─────────────────────────────────────────────────────────

#[tokio::test]
async fn removing_twice_broadcasts_once() {
    let (handle, clipboard) = spawn_hub();
    let entry = clipboard.add("target");

    let (id, mut rx) = join(&handle, 64).await;
    recv_snapshot(&mut rx).await;

    handle
        .submit(id, ClientMessage::Remove { id: entry.id })
        .await
        .unwrap();
    handle
        .submit(id, ClientMessage::Remove { id: entry.id })
        .await
        .unwrap();
    handle
        .submit(
            id,
            ClientMessage::Add {
                content: "sentinel".to_string(),
            },
        )
        .await
        .unwrap();

    let tags = collect_tags(&mut rx, 2).await;
    assert!(tags[0].starts_with("remove:"), "first remove broadcasts");
    assert!(
        tags[1].starts_with("add:"),
        "second remove must broadcast nothing before the sentinel add"
    );
}
