// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end lifecycle tests driving the registry with mock adapters.
//!
//! All tests run under paused tokio time, so QR expiry, heartbeat, and
//! reconnect timers fire deterministically without real waiting.

use std::sync::Arc;
use std::time::Duration;

use unibox_config::model::SessionConfig;
use unibox_core::UniboxError;
use unibox_core::types::{ChatMessage, ClientEvent, ConnectivityState, SessionStatus};
use unibox_session::SessionRegistry;
use unibox_test_utils::{
    MemoryMessageStore, MemoryStatusStore, MockBlobStore, MockClientFactory, MockProtocolClient,
    StaticChannelDirectory,
};

struct Harness {
    registry: SessionRegistry,
    factory: Arc<MockClientFactory>,
    status: Arc<MemoryStatusStore>,
    messages: Arc<MemoryMessageStore>,
    directory: Arc<StaticChannelDirectory>,
    blobs: Arc<MockBlobStore>,
}

fn harness() -> Harness {
    let factory = Arc::new(MockClientFactory::new());
    let status = Arc::new(MemoryStatusStore::new());
    let messages = Arc::new(MemoryMessageStore::new());
    let directory = Arc::new(StaticChannelDirectory::new());
    let blobs = Arc::new(MockBlobStore::new());
    let registry = SessionRegistry::new(
        SessionConfig::default(),
        factory.clone(),
        status.clone(),
        messages.clone(),
        directory.clone(),
        blobs.clone(),
    );
    Harness {
        registry,
        factory,
        status,
        messages,
        directory,
        blobs,
    }
}

/// Let spawned tasks (event pumps, timers) run to completion.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn connect(h: &Harness, user_id: &str) -> Arc<MockProtocolClient> {
    h.registry.start_session(user_id, "co-1").await.unwrap();
    let client = h.factory.latest().await.unwrap();
    client
        .emit(ClientEvent::Ready {
            phone: "+15550100".to_string(),
            display_name: "Ada".to_string(),
        })
        .await;
    settle().await;
    client
}

fn chat_message(channel_id: &str, with_media: bool) -> ChatMessage {
    ChatMessage {
        id: "msg-1".to_string(),
        channel_id: channel_id.to_string(),
        channel_name: "Ops Team".to_string(),
        sender_name: "Grace".to_string(),
        sender_number: "+15550199".to_string(),
        body: "standup in 5".to_string(),
        has_media: with_media,
        mime_type: with_media.then(|| "image/jpeg".to_string()),
        timestamp: 1_700_000_000_000,
        from_me: false,
    }
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_with_one_client_and_one_entry() {
    let h = harness();

    let first = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(first.status, SessionStatus::Initializing);

    let second = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(second.status, SessionStatus::Initializing);

    assert_eq!(h.factory.created().await, 1);
    assert_eq!(h.registry.live_sessions(), 1);
}

#[tokio::test(start_paused = true)]
async fn start_after_connected_returns_live_status() {
    let h = harness();
    connect(&h, "user-1").await;

    let snapshot = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Connected);
    assert_eq!(snapshot.phone.as_deref(), Some("+15550100"));
    assert_eq!(h.factory.created().await, 1);
}

#[tokio::test(start_paused = true)]
async fn pairing_flow_persists_and_exposes_qr() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();
    let client = h.factory.client(0).await;

    client
        .emit(ClientEvent::PairingCode {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    let snapshot = h.registry.session_status("user-1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::QrPending);
    assert_eq!(
        h.registry.pairing_code("user-1").await.unwrap().as_deref(),
        Some("2@abc")
    );
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::QrPending);
    assert_eq!(record.qr_code.as_deref(), Some("2@abc"));

    client.emit(ClientEvent::Authenticated).await;
    settle().await;

    assert_eq!(
        h.registry.session_status("user-1").await.unwrap().status,
        SessionStatus::Authenticating
    );
    assert!(h.registry.pairing_code("user-1").await.unwrap().is_none());
    let record = h.status.record("user-1").await.unwrap();
    assert!(record.qr_code.is_none(), "scan must clear the stored code");
}

#[tokio::test(start_paused = true)]
async fn qr_expiry_tears_session_down_without_reconnect() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();
    let client = h.factory.client(0).await;
    client
        .emit(ClientEvent::PairingCode {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    tokio::time::sleep(Duration::from_secs(121)).await;

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_destroyed());
    assert!(!client.was_logged_out(), "expiry must preserve credentials");
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(record.last_error.as_deref(), Some("QR code expired"));

    // No reconnect is ever scheduled for an expired pairing.
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.factory.created().await, 1);
}

#[tokio::test(start_paused = true)]
async fn scan_cancels_expiry_timer() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();
    let client = h.factory.client(0).await;
    client
        .emit(ClientEvent::PairingCode {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    client.emit(ClientEvent::Authenticated).await;
    settle().await;

    tokio::time::sleep(Duration::from_secs(200)).await;
    assert_eq!(h.registry.live_sessions(), 1, "expiry must not fire after scan");
}

#[tokio::test(start_paused = true)]
async fn transient_disconnect_reconnects_with_backoff() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;

    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(record.last_error.as_deref(), Some("connection reset"));
    assert_eq!(h.registry.live_sessions(), 1, "session stays registered while retrying");

    // First attempt fires at 5s, not before.
    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(h.factory.created().await, 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.factory.created().await, 2);
    assert!(client.was_destroyed(), "stale handle replaced on reconnect");

    // Make the second attempt fail; the next delay doubles to 10s.
    h.factory
        .push_init_error(UniboxError::Client {
            message: "handshake failed".to_string(),
            source: None,
        })
        .await;
    let second = h.factory.client(1).await;
    second
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    // Second client reconnected but never emitted Ready, so the disconnect
    // arrives while initializing and schedules the next attempt.
    settle().await;
    tokio::time::sleep(Duration::from_millis(9_900)).await;
    assert_eq!(h.factory.created().await, 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.factory.created().await, 3);
}

#[tokio::test(start_paused = true)]
async fn start_during_pending_reconnect_tears_down_the_old_session() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;

    // Restart before the 5s reconnect delay elapses. The replaced session
    // still held its client, pump, and armed timer.
    let snapshot = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Initializing);
    assert!(client.was_destroyed(), "old client handle must be torn down");
    assert!(!client.was_logged_out(), "restart preserves credentials");
    assert_eq!(h.factory.created().await, 2);
    assert_eq!(h.registry.live_sessions(), 1);

    // The old reconnect timer must never fire into the new session, and
    // late events from the old client must mutate nothing.
    client
        .emit(ClientEvent::AuthFailure {
            reason: "stale".to_string(),
        })
        .await;
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 2);
    assert_eq!(h.registry.live_sessions(), 1);
    assert_eq!(
        h.registry.session_status("user-1").await.unwrap().status,
        SessionStatus::Initializing
    );
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_slow_handshake_leaves_no_live_client() {
    let h = harness();
    h.factory.push_init_delay(Duration::from_secs(5)).await;

    let registry = h.registry.clone();
    let start = tokio::spawn(async move { registry.start_session("user-1", "co-1").await });
    settle().await;
    assert_eq!(h.factory.created().await, 1, "handshake is in flight");

    h.registry.stop_session("user-1", false).await.unwrap();

    // The handshake completes after the stop; its client must be discarded.
    let result = start.await.unwrap();
    assert!(matches!(result, Err(UniboxError::NotFound { .. })));
    assert_eq!(h.registry.live_sessions(), 0);
    assert!(h.factory.client(0).await.was_destroyed());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 1, "nothing left running");
}

#[tokio::test(start_paused = true)]
async fn stop_during_pending_reconnect_cancels_the_timer() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;

    // Stop while the 5s reconnect timer is armed.
    h.registry.stop_session("user-1", false).await.unwrap();
    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_destroyed());

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 1, "cancelled timer never fires");
    assert_eq!(h.registry.live_sessions(), 0);
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn authenticated_resets_attempt_counter() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    // One full disconnect/reconnect/ready cycle.
    client
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert_eq!(h.factory.created().await, 2);
    let second = h.factory.client(1).await;
    second
        .emit(ClientEvent::Ready {
            phone: "+15550100".to_string(),
            display_name: "Ada".to_string(),
        })
        .await;
    settle().await;

    // With the counter reset, the next transient disconnect schedules at
    // the base delay again rather than the doubled one.
    second
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    assert_eq!(h.factory.created().await, 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_finalize_and_remove_session() {
    let h = harness();
    connect(&h, "user-1").await;

    for _ in 0..5 {
        h.factory
            .push_init_error(UniboxError::Client {
                message: "handshake failed".to_string(),
                source: None,
            })
            .await;
    }
    let client = h.factory.client(0).await;
    client
        .emit(ClientEvent::Disconnected {
            reason: "connection reset".to_string(),
        })
        .await;
    settle().await;

    // Delays 5+10+20+40+60 seconds, then the budget is spent.
    tokio::time::sleep(Duration::from_secs(200)).await;

    assert_eq!(h.registry.live_sessions(), 0);
    assert_eq!(h.factory.created().await, 6);
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(
        record.last_error.as_deref(),
        Some("manual reconnection required")
    );

    // And nothing else is armed.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 6);
}

#[tokio::test(start_paused = true)]
async fn non_recoverable_disconnect_logs_out_and_never_reconnects() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Disconnected {
            reason: "LOGOUT".to_string(),
        })
        .await;
    settle().await;

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_logged_out(), "credentials must be discarded");
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(record.last_error.as_deref(), Some("LOGOUT"));

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 1);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_ends_in_error_with_credentials_discarded() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();
    let client = h.factory.client(0).await;

    client
        .emit(ClientEvent::AuthFailure {
            reason: "pairing rejected".to_string(),
        })
        .await;
    settle().await;

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_logged_out());
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Error);
    assert_eq!(record.last_error.as_deref(), Some("pairing rejected"));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_pairing_preserves_credentials_and_mutes_late_events() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();
    let client = h.factory.client(0).await;
    client
        .emit(ClientEvent::PairingCode {
            code: "2@abc".to_string(),
        })
        .await;
    settle().await;

    h.registry.cancel_session("user-1").await.unwrap();

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_destroyed());
    assert!(!client.was_logged_out());
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(record.last_error.as_deref(), Some("pairing cancelled"));

    // Late events from the dead client must mutate nothing.
    client.emit(ClientEvent::Authenticated).await;
    client
        .emit(ClientEvent::Ready {
            phone: "+15550100".to_string(),
            display_name: "Ada".to_string(),
        })
        .await;
    settle().await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(h.registry.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_requires_a_pairing_state() {
    let h = harness();
    connect(&h, "user-1").await;

    let result = h.registry.cancel_session("user-1").await;
    assert!(matches!(
        result,
        Err(UniboxError::InvalidState {
            status: SessionStatus::Connected,
            ..
        })
    ));
    assert_eq!(h.registry.live_sessions(), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_with_credential_deletion_logs_out() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    h.registry.stop_session("user-1", true).await.unwrap();

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_logged_out());
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);

    // No heartbeat or reconnect survives the stop.
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.factory.created().await, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_without_credential_deletion_only_destroys() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    h.registry.stop_session("user-1", false).await.unwrap();

    assert!(client.was_destroyed());
    assert!(!client.was_logged_out());
    assert!(matches!(
        h.registry.stop_session("user-1", false).await,
        Err(UniboxError::NotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn heartbeat_touches_store_while_healthy() {
    let h = harness();
    connect(&h, "user-1").await;

    let before = h.status.record("user-1").await.unwrap();
    assert!(before.last_heartbeat_at.is_none());

    tokio::time::sleep(Duration::from_secs(61)).await;

    let after = h.status.record("user-1").await.unwrap();
    assert!(after.last_heartbeat_at.is_some());
    assert_eq!(after.status, SessionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_unpaired_state_routes_to_reconnect() {
    let h = harness();
    let client = connect(&h, "user-1").await;
    client.set_probe_state(ConnectivityState::Unpaired).await;

    tokio::time::sleep(Duration::from_secs(61)).await;

    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Disconnected);
    assert_eq!(h.registry.live_sessions(), 1, "transient path keeps the session");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.factory.created().await, 2, "reconnect fired");
}

#[tokio::test(start_paused = true)]
async fn fatal_probe_error_routes_to_reconnect() {
    let h = harness();
    let client = connect(&h, "user-1").await;
    client
        .set_probe_error("Protocol error (Runtime.callFunctionOn): Session closed.")
        .await;

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(
        h.status.record("user-1").await.unwrap().status,
        SessionStatus::Disconnected
    );

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.factory.created().await, 2);
}

#[tokio::test(start_paused = true)]
async fn transient_probe_error_is_tolerated() {
    let h = harness();
    let client = connect(&h, "user-1").await;
    client.set_probe_error("evaluation timed out").await;

    tokio::time::sleep(Duration::from_secs(185)).await;

    assert_eq!(
        h.registry.session_status("user-1").await.unwrap().status,
        SessionStatus::Connected
    );
    assert_eq!(h.factory.created().await, 1);
}

#[tokio::test(start_paused = true)]
async fn monitored_channel_messages_are_ingested_with_media() {
    let h = harness();
    h.directory.add("user-1", "chan-1", "Ops Team", true).await;
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Message {
            message: chat_message("chan-1", true),
        })
        .await;
    settle().await;

    let messages = h.messages.messages().await;
    assert_eq!(messages.len(), 1);
    let msg = &messages[0];
    assert_eq!(msg.user_id, "user-1");
    assert_eq!(msg.company_id, "co-1");
    assert!(msg.has_media);
    assert_eq!(
        msg.storage_key.as_deref(),
        Some("co-1/ops_team/1700000000000.jpg")
    );
    assert_eq!(
        msg.download_url.as_deref(),
        Some("mock://co-1/ops_team/1700000000000.jpg")
    );
    assert_eq!(h.blobs.upload_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn media_failure_never_blocks_message_ingestion() {
    let h = harness();
    h.directory.add("user-1", "chan-1", "Ops Team", true).await;
    h.blobs.set_fail_uploads(true);
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Message {
            message: chat_message("chan-1", true),
        })
        .await;
    settle().await;

    let messages = h.messages.messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].has_media);
    assert!(messages[0].storage_key.is_none());
    assert!(messages[0].download_url.is_none());
}

#[tokio::test(start_paused = true)]
async fn unmonitored_channels_are_skipped() {
    let h = harness();
    h.directory.add("user-1", "chan-1", "Ops Team", true).await;
    h.directory.add("user-1", "chan-2", "Noise", false).await;
    let client = connect(&h, "user-1").await;

    client
        .emit(ClientEvent::Message {
            message: chat_message("chan-2", false),
        })
        .await;
    client
        .emit(ClientEvent::Message {
            message: chat_message("chan-9", false),
        })
        .await;
    client
        .emit(ClientEvent::MessageSent {
            message: chat_message("chan-1", false),
        })
        .await;
    settle().await;

    let messages = h.messages.messages().await;
    assert_eq!(messages.len(), 1, "only the monitored channel is ingested");
    assert_eq!(messages[0].channel_id, "chan-1");
    assert!(!messages[0].from_me);
}

#[tokio::test(start_paused = true)]
async fn restore_starts_exactly_the_connected_rows() {
    let h = harness();
    for (user, company, status) in [
        ("user-1", "co-1", SessionStatus::Connected),
        ("user-2", "co-2", SessionStatus::Connected),
        ("user-3", "co-1", SessionStatus::Disconnected),
    ] {
        h.status
            .seed(unibox_core::types::SessionRecord {
                user_id: user.to_string(),
                company_id: company.to_string(),
                status,
                phone: Some("+15550100".to_string()),
                display_name: Some("Ada".to_string()),
                qr_code: None,
                last_error: None,
                last_heartbeat_at: None,
                updated_at: "2026-02-01T00:00:00Z".to_string(),
            })
            .await;
    }

    let count = h.registry.restore_sessions().await.unwrap();
    assert_eq!(count, 2);
    settle().await;

    assert_eq!(h.factory.created().await, 2);
    assert_eq!(h.registry.live_sessions(), 2);
    assert!(h.registry.session_status("user-3").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_preserves_durable_status_for_next_boot() {
    let h = harness();
    let client = connect(&h, "user-1").await;

    h.registry.shutdown().await;

    assert_eq!(h.registry.live_sessions(), 0);
    assert!(client.was_destroyed());
    assert!(!client.was_logged_out());
    // Durable status stays connected so restore picks it up.
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Connected);
}

#[tokio::test(start_paused = true)]
async fn stale_lock_is_cleared_and_start_retried_once() {
    let h = harness();
    h.factory
        .push_init_error(UniboxError::SessionLocked {
            user_id: "user-1".to_string(),
        })
        .await;

    let snapshot = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Initializing);
    assert_eq!(h.factory.cleared_locks().await, vec!["user-1".to_string()]);
    assert_eq!(h.factory.created().await, 2, "one failed handle, one live");
}

#[tokio::test(start_paused = true)]
async fn persistent_lock_surfaces_the_error() {
    let h = harness();
    for _ in 0..2 {
        h.factory
            .push_init_error(UniboxError::SessionLocked {
                user_id: "user-1".to_string(),
            })
            .await;
    }

    let result = h.registry.start_session("user-1", "co-1").await;
    assert!(matches!(result, Err(UniboxError::SessionLocked { .. })));
    assert_eq!(h.registry.live_sessions(), 0);
    let record = h.status.record("user-1").await.unwrap();
    assert_eq!(record.status, SessionStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn status_write_failures_do_not_break_the_lifecycle() {
    let h = harness();
    h.status.set_fail_writes(true);

    let snapshot = h.registry.start_session("user-1", "co-1").await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Initializing);

    let client = h.factory.client(0).await;
    client
        .emit(ClientEvent::Ready {
            phone: "+15550100".to_string(),
            display_name: "Ada".to_string(),
        })
        .await;
    settle().await;

    // In-memory state stays authoritative even though nothing persisted.
    assert_eq!(
        h.registry.session_status("user-1").await.unwrap().status,
        SessionStatus::Connected
    );
    assert!(h.status.record("user-1").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn channels_require_a_connected_session() {
    let h = harness();
    h.registry.start_session("user-1", "co-1").await.unwrap();

    assert!(matches!(
        h.registry.channels("user-1").await,
        Err(UniboxError::InvalidState { .. })
    ));

    let client = h.factory.client(0).await;
    client
        .set_channels(vec![unibox_core::types::ChannelInfo {
            id: "chan-1".to_string(),
            name: "Ops Team".to_string(),
            participant_count: 12,
        }])
        .await;
    client
        .emit(ClientEvent::Ready {
            phone: "+15550100".to_string(),
            display_name: "Ada".to_string(),
        })
        .await;
    settle().await;

    let channels = h.registry.channels("user-1").await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "Ops Team");

    assert!(matches!(
        h.registry.channels("nobody").await,
        Err(UniboxError::NotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn sessions_for_different_users_are_independent() {
    let h = harness();
    connect(&h, "user-1").await;
    h.registry.start_session("user-2", "co-2").await.unwrap();

    assert_eq!(h.registry.live_sessions(), 2);

    h.registry.stop_session("user-1", true).await.unwrap();
    assert_eq!(h.registry.live_sessions(), 1);
    assert_eq!(
        h.registry.session_status("user-2").await.unwrap().status,
        SessionStatus::Initializing
    );
}
