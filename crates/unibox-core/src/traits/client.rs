// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol client trait for the browser-automation-backed messaging client.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::UniboxError;
use crate::types::{ChannelInfo, ChatMessage, ClientEvent, ConnectivityState, MediaPayload};

/// A live handle to one user's automation-backed messaging client.
///
/// Exactly one handle exists per paired user at any time; the registry owns
/// it exclusively. Lifecycle events are delivered out-of-band on the mpsc
/// receiver returned by [`ClientFactory::create`], in emission order.
#[async_trait]
pub trait ProtocolClient: Send + Sync + 'static {
    /// Starts the client handshake. Pairing and connection continue
    /// asynchronously via the event stream after this returns.
    ///
    /// Fails with [`UniboxError::SessionLocked`] when the local
    /// pairing-credential store is held by a stale lock.
    async fn initialize(&self) -> Result<(), UniboxError>;

    /// Tears down the client, preserving locally cached pairing credentials
    /// so a later restart can resume without a new QR scan.
    async fn destroy(&self) -> Result<(), UniboxError>;

    /// Logs the account out and deletes locally cached pairing credentials.
    async fn logout(&self) -> Result<(), UniboxError>;

    /// Probes the low-level connectivity state. Used by the heartbeat
    /// monitor while the session is connected.
    async fn connectivity_state(&self) -> Result<ConnectivityState, UniboxError>;

    /// Lists the channels visible to the paired account.
    async fn list_channels(&self) -> Result<Vec<ChannelInfo>, UniboxError>;

    /// Downloads the raw media attached to a message.
    async fn download_media(&self, message: &ChatMessage) -> Result<MediaPayload, UniboxError>;
}

/// A freshly created client handle together with its event stream.
pub struct ClientSession {
    pub client: Arc<dyn ProtocolClient>,
    pub events: mpsc::Receiver<ClientEvent>,
}

/// Creates protocol clients and manages their local credential stores.
///
/// The factory owns the per-user on-disk pairing-credential directories;
/// [`clear_stale_lock`](ClientFactory::clear_stale_lock) removes the lock
/// artifact left behind by an unclean shutdown so initialization can be
/// retried.
#[async_trait]
pub trait ClientFactory: Send + Sync + 'static {
    /// Creates a new client handle for a user, re-using any persisted
    /// pairing credentials.
    async fn create(&self, user_id: &str) -> Result<ClientSession, UniboxError>;

    /// Forcibly removes the local credential-store lock for a user.
    async fn clear_stale_lock(&self, user_id: &str) -> Result<(), UniboxError>;
}
