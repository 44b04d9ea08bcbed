// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock protocol client and factory for deterministic lifecycle tests.
//!
//! `MockProtocolClient` captures every lifecycle call (initialize, destroy,
//! logout) in flags and lets tests drive the session by emitting events on
//! the same mpsc channel a real client would use. `MockClientFactory` keeps
//! a handle to every client it created so tests can emit events and assert
//! on call capture after the registry has taken ownership.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use unibox_core::types::{
    ChannelInfo, ChatMessage, ClientEvent, ConnectivityState, MediaPayload,
};
use unibox_core::{ClientFactory, ClientSession, ProtocolClient, UniboxError};

/// A mock automation client for testing.
///
/// Defaults: initialization succeeds, connectivity probes report
/// `Connected`, media downloads return a small JPEG payload.
pub struct MockProtocolClient {
    user_id: String,
    sender: mpsc::Sender<ClientEvent>,
    initialized: AtomicBool,
    destroyed: AtomicBool,
    logged_out: AtomicBool,
    init_error: Mutex<Option<UniboxError>>,
    init_delay: Mutex<Option<Duration>>,
    probe: Mutex<Result<ConnectivityState, String>>,
    channels: Mutex<Vec<ChannelInfo>>,
    fail_download: AtomicBool,
}

impl MockProtocolClient {
    fn new(
        user_id: &str,
        sender: mpsc::Sender<ClientEvent>,
        init_error: Option<UniboxError>,
        init_delay: Option<Duration>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            sender,
            initialized: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            logged_out: AtomicBool::new(false),
            init_error: Mutex::new(init_error),
            init_delay: Mutex::new(init_delay),
            probe: Mutex::new(Ok(ConnectivityState::Connected)),
            channels: Mutex::new(Vec::new()),
            fail_download: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Emit a lifecycle or message event as the real client would.
    ///
    /// Send failures are ignored: after the registry drops the receiver the
    /// event simply goes nowhere, matching a torn-down session.
    pub async fn emit(&self, event: ClientEvent) {
        let _ = self.sender.send(event).await;
    }

    pub fn was_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn was_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn was_logged_out(&self) -> bool {
        self.logged_out.load(Ordering::SeqCst)
    }

    /// Configure what the next connectivity probes report.
    pub async fn set_probe_state(&self, state: ConnectivityState) {
        *self.probe.lock().await = Ok(state);
    }

    /// Make connectivity probes fail with the given error message.
    pub async fn set_probe_error(&self, message: &str) {
        *self.probe.lock().await = Err(message.to_string());
    }

    pub async fn set_channels(&self, channels: Vec<ChannelInfo>) {
        *self.channels.lock().await = channels;
    }

    pub fn set_fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProtocolClient for MockProtocolClient {
    async fn initialize(&self) -> Result<(), UniboxError> {
        let delay = self.init_delay.lock().await.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.init_error.lock().await.take() {
            return Err(e);
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn destroy(&self) -> Result<(), UniboxError> {
        self.destroyed.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), UniboxError> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn connectivity_state(&self) -> Result<ConnectivityState, UniboxError> {
        match &*self.probe.lock().await {
            Ok(state) => Ok(*state),
            Err(message) => Err(UniboxError::Client {
                message: message.clone(),
                source: None,
            }),
        }
    }

    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, UniboxError> {
        Ok(self.channels.lock().await.clone())
    }

    async fn download_media(&self, message: &ChatMessage) -> Result<MediaPayload, UniboxError> {
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(UniboxError::Client {
                message: format!("media download failed for {}", message.id),
                source: None,
            });
        }
        Ok(MediaPayload {
            data: b"mock media bytes".to_vec(),
            mime_type: message
                .mime_type
                .clone()
                .unwrap_or_else(|| "image/jpeg".to_string()),
        })
    }
}

/// Creates mock clients and records lock-clear requests.
///
/// Initialization errors can be scripted per created client via
/// [`push_init_error`](MockClientFactory::push_init_error): the first
/// queued error fails the first subsequently created client, and so on.
#[derive(Default)]
pub struct MockClientFactory {
    clients: Mutex<Vec<Arc<MockProtocolClient>>>,
    cleared_locks: Mutex<Vec<String>>,
    init_errors: Mutex<VecDeque<UniboxError>>,
    init_delays: Mutex<VecDeque<Duration>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clients created so far.
    pub async fn created(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// The nth created client.
    pub async fn client(&self, index: usize) -> Arc<MockProtocolClient> {
        self.clients.lock().await[index].clone()
    }

    /// The most recently created client.
    pub async fn latest(&self) -> Option<Arc<MockProtocolClient>> {
        self.clients.lock().await.last().cloned()
    }

    /// Queue an error for the next created client's `initialize` call.
    pub async fn push_init_error(&self, error: UniboxError) {
        self.init_errors.lock().await.push_back(error);
    }

    /// Make the next created client's `initialize` call take this long,
    /// so tests can interleave other operations with a handshake.
    pub async fn push_init_delay(&self, delay: Duration) {
        self.init_delays.lock().await.push_back(delay);
    }

    /// User ids for which `clear_stale_lock` was called.
    pub async fn cleared_locks(&self) -> Vec<String> {
        self.cleared_locks.lock().await.clone()
    }
}

#[async_trait]
impl ClientFactory for MockClientFactory {
    async fn create(&self, user_id: &str) -> Result<ClientSession, UniboxError> {
        let (sender, events) = mpsc::channel(64);
        let init_error = self.init_errors.lock().await.pop_front();
        let init_delay = self.init_delays.lock().await.pop_front();
        let client = Arc::new(MockProtocolClient::new(user_id, sender, init_error, init_delay));
        self.clients.lock().await.push(client.clone());
        Ok(ClientSession { client, events })
    }

    async fn clear_stale_lock(&self, user_id: &str) -> Result<(), UniboxError> {
        self.cleared_locks.lock().await.push(user_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn factory_tracks_created_clients() {
        let factory = MockClientFactory::new();
        assert_eq!(factory.created().await, 0);

        let session = factory.create("user-1").await.unwrap();
        assert_eq!(factory.created().await, 1);
        assert_eq!(factory.client(0).await.user_id(), "user-1");
        drop(session);
    }

    #[tokio::test]
    async fn scripted_init_error_fails_next_client_only() {
        let factory = MockClientFactory::new();
        factory
            .push_init_error(UniboxError::SessionLocked {
                user_id: "user-1".to_string(),
            })
            .await;

        let first = factory.create("user-1").await.unwrap();
        assert!(matches!(
            first.client.initialize().await,
            Err(UniboxError::SessionLocked { .. })
        ));

        let second = factory.create("user-1").await.unwrap();
        assert!(second.client.initialize().await.is_ok());
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let factory = MockClientFactory::new();
        let mut session = factory.create("user-1").await.unwrap();
        let client = factory.client(0).await;

        client.emit(ClientEvent::Authenticated).await;
        client
            .emit(ClientEvent::Ready {
                phone: "+15550100".to_string(),
                display_name: "Ada".to_string(),
            })
            .await;

        assert!(matches!(
            session.events.recv().await,
            Some(ClientEvent::Authenticated)
        ));
        assert!(matches!(
            session.events.recv().await,
            Some(ClientEvent::Ready { .. })
        ));
    }

    #[tokio::test]
    async fn call_capture_flags() {
        let factory = MockClientFactory::new();
        let session = factory.create("user-1").await.unwrap();
        let client = factory.client(0).await;

        session.client.initialize().await.unwrap();
        session.client.destroy().await.unwrap();
        assert!(client.was_initialized());
        assert!(client.was_destroyed());
        assert!(!client.was_logged_out());

        session.client.logout().await.unwrap();
        assert!(client.was_logged_out());
    }

    #[tokio::test]
    async fn probe_configuration() {
        let factory = MockClientFactory::new();
        let session = factory.create("user-1").await.unwrap();
        let client = factory.client(0).await;

        assert!(matches!(
            session.client.connectivity_state().await,
            Ok(ConnectivityState::Connected)
        ));

        client.set_probe_state(ConnectivityState::Unpaired).await;
        assert!(matches!(
            session.client.connectivity_state().await,
            Ok(ConnectivityState::Unpaired)
        ));

        client.set_probe_error("Protocol error (Target.closed)").await;
        assert!(session.client.connectivity_state().await.is_err());
    }
}
