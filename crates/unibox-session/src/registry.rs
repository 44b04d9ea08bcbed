// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session registry: the lifecycle manager owning every live session.
//!
//! One [`SessionRegistry`] per process. Each session is a
//! [`SessionHandle`] in a concurrent map; all mutation of a session goes
//! through its own `tokio::sync::Mutex`, so a heartbeat-driven disconnect
//! and a user-triggered stop can never race on the same client handle.
//! Cross-session operations run fully in parallel.
//!
//! Client lifecycle events arrive on a per-session mpsc receiver consumed
//! by a single pump task, preserving the client's emission order. Timers
//! (QR expiry, heartbeat, reconnect) are tokio tasks guarded by
//! cancellation tokens stored in the handle; stop and cancel revoke them
//! before returning, so no side effect fires for a session the caller
//! believes is gone.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use unibox_config::model::SessionConfig;
use unibox_core::types::{
    ChannelInfo, ChatMessage, ClientEvent, IngestedMessage, SessionSnapshot, SessionStatus,
    StatusUpdate,
};
use unibox_core::{
    BlobStore, ChannelDirectory, ClientFactory, ClientSession, MessageStore, ProtocolClient,
    StatusStore, UniboxError,
};

use crate::machine::{SessionMachine, recoverable_disconnect};
use crate::media::MediaPipeline;
use crate::{heartbeat, reconnect};

/// One live session: the state machine plus the resources the registry
/// owns on its behalf.
pub(crate) struct SessionInner {
    machine: SessionMachine,
    client: Option<Arc<dyn ProtocolClient>>,
    /// Event pump consuming the client's mpsc stream.
    pump: Option<JoinHandle<()>>,
    qr_timer: Option<CancellationToken>,
    heartbeat: Option<CancellationToken>,
    reconnect: Option<CancellationToken>,
}

impl SessionInner {
    fn cancel_timers(&mut self) {
        for token in [
            self.qr_timer.take(),
            self.heartbeat.take(),
            self.reconnect.take(),
        ]
        .into_iter()
        .flatten()
        {
            token.cancel();
        }
    }
}

pub(crate) struct SessionHandle {
    user_id: String,
    inner: Mutex<SessionInner>,
}

impl SessionHandle {
    fn new(user_id: &str, company_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            inner: Mutex::new(SessionInner {
                machine: SessionMachine::new(user_id, company_id),
                client: None,
                pump: None,
                qr_timer: None,
                heartbeat: None,
                reconnect: None,
            }),
        }
    }
}

pub(crate) struct RegistryInner {
    config: SessionConfig,
    factory: Arc<dyn ClientFactory>,
    status_store: Arc<dyn StatusStore>,
    message_store: Arc<dyn MessageStore>,
    channel_directory: Arc<dyn ChannelDirectory>,
    media: MediaPipeline,
    sessions: DashMap<String, Arc<SessionHandle>>,
}

/// Top-level lifecycle manager. Cheap to clone handles out of via `Arc`;
/// construct exactly one per process.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new(
        config: SessionConfig,
        factory: Arc<dyn ClientFactory>,
        status_store: Arc<dyn StatusStore>,
        message_store: Arc<dyn MessageStore>,
        channel_directory: Arc<dyn ChannelDirectory>,
        blob_store: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                factory,
                status_store,
                message_store,
                channel_directory,
                media: MediaPipeline::new(blob_store),
                sessions: DashMap::new(),
            }),
        }
    }

    /// Starts (or re-surfaces) the session for a user. Idempotent: a second
    /// start while a non-terminal session exists returns its current status
    /// without creating another client.
    pub async fn start_session(
        &self,
        user_id: &str,
        company_id: &str,
    ) -> Result<SessionSnapshot, UniboxError> {
        self.inner.start_session(user_id, company_id).await
    }

    /// Stops a session: cancels its timers, tears the client down, persists
    /// a disconnected status, and removes it from the registry.
    /// `delete_credentials` selects logout (fresh QR needed later) over a
    /// plain destroy (credentials kept for a later restart).
    pub async fn stop_session(
        &self,
        user_id: &str,
        delete_credentials: bool,
    ) -> Result<(), UniboxError> {
        self.inner.stop_session(user_id, delete_credentials).await
    }

    /// Abandons an in-progress pairing. Valid only while the session is
    /// `initializing` or `qr_pending`; never deletes credentials.
    pub async fn cancel_session(&self, user_id: &str) -> Result<(), UniboxError> {
        self.inner.cancel_session(user_id).await
    }

    /// Pure in-memory status read; never touches the durable store.
    pub async fn session_status(&self, user_id: &str) -> Result<SessionSnapshot, UniboxError> {
        self.inner.session_status(user_id).await
    }

    /// Current pairing code, present only while the session is `qr_pending`.
    pub async fn pairing_code(&self, user_id: &str) -> Result<Option<String>, UniboxError> {
        self.inner.pairing_code(user_id).await
    }

    /// Channels visible to the paired account. Requires a connected session.
    pub async fn channels(&self, user_id: &str) -> Result<Vec<ChannelInfo>, UniboxError> {
        self.inner.channels(user_id).await
    }

    /// Restarts every session last known connected, in parallel, without
    /// blocking the caller past the status-store query. Returns the number
    /// of restorations kicked off.
    pub async fn restore_sessions(&self) -> Result<usize, UniboxError> {
        self.inner.restore_sessions().await
    }

    /// Destroys every live client handle without touching durable status,
    /// so `restore_sessions` on the next boot resumes them.
    pub async fn shutdown(&self) {
        self.inner.shutdown().await;
    }

    /// Number of live registry entries.
    pub fn live_sessions(&self) -> usize {
        self.inner.sessions.len()
    }
}

impl RegistryInner {
    fn handle(&self, user_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(user_id).map(|entry| entry.value().clone())
    }

    async fn start_session(
        self: &Arc<Self>,
        user_id: &str,
        company_id: &str,
    ) -> Result<SessionSnapshot, UniboxError> {
        if let Some(existing) = self.handle(user_id) {
            let mut inner = existing.inner.lock().await;
            if !inner.machine.status().is_terminal() {
                debug!(
                    user_id = %user_id,
                    status = %inner.machine.status(),
                    "start is a no-op, session already live"
                );
                return Ok(inner.machine.snapshot());
            }
            // A terminal leftover can still hold resources: a session
            // waiting out a reconnect delay sits here as disconnected with
            // its client, pump, and timer intact. Tear it all down before
            // replacing it; only one client handle may exist per user.
            inner.cancel_timers();
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            if let Some(client) = inner.client.take() {
                if let Err(e) = client.destroy().await {
                    warn!(
                        user_id = %user_id,
                        error = %e,
                        "stale client destroy failed during restart"
                    );
                }
            }
            drop(inner);
            self.sessions.remove(user_id);
        }

        let handle = Arc::new(SessionHandle::new(user_id, company_id));
        {
            let mut inner = handle.inner.lock().await;
            inner.machine.transition(SessionStatus::Initializing);
        }

        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(occupied) => {
                // Lost the race against a concurrent start; defer to it.
                let other = occupied.get().clone();
                drop(occupied);
                let inner = other.inner.lock().await;
                return Ok(inner.machine.snapshot());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(handle.clone());
            }
        }

        self.persist(
            user_id,
            StatusUpdate::status(SessionStatus::Initializing)
                .with_company(company_id)
                .clear_qr()
                .clear_error(),
        )
        .await;

        match self.connect_client(user_id).await {
            Ok(session) => {
                let mut inner = handle.inner.lock().await;
                // The handshake ran without the session lock; a concurrent
                // stop may have removed this handle in the meantime. The
                // fresh client must not outlive a stopped session.
                let still_registered = self
                    .handle(user_id)
                    .is_some_and(|current| Arc::ptr_eq(&current, &handle));
                if !still_registered {
                    drop(inner);
                    if let Err(e) = session.client.destroy().await {
                        warn!(
                            user_id = %user_id,
                            error = %e,
                            "orphaned client destroy failed after stop won the race"
                        );
                    }
                    return Err(UniboxError::NotFound {
                        user_id: user_id.to_string(),
                    });
                }
                inner.client = Some(session.client);
                inner.pump = Some(self.spawn_pump(user_id.to_string(), session.events));
                info!(user_id = %user_id, company_id = %company_id, "session started");
                Ok(inner.machine.snapshot())
            }
            Err(e) => {
                self.sessions.remove(user_id);
                self.persist(
                    user_id,
                    StatusUpdate::status(SessionStatus::Error).with_error(&e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Creates and initializes a client, with a one-shot stale-lock-clear
    /// retry when the credential store is held by an unclean prior shutdown.
    async fn connect_client(&self, user_id: &str) -> Result<ClientSession, UniboxError> {
        match self.try_connect(user_id).await {
            Err(UniboxError::SessionLocked { .. }) => {
                warn!(
                    user_id = %user_id,
                    "credential store locked, clearing stale lock and retrying once"
                );
                self.factory.clear_stale_lock(user_id).await?;
                self.try_connect(user_id).await
            }
            other => other,
        }
    }

    async fn try_connect(&self, user_id: &str) -> Result<ClientSession, UniboxError> {
        let session = self.factory.create(user_id).await?;
        if let Err(e) = session.client.initialize().await {
            if let Err(destroy_err) = session.client.destroy().await {
                warn!(
                    user_id = %user_id,
                    error = %destroy_err,
                    "failed to destroy client after initialization error"
                );
            }
            return Err(e);
        }
        Ok(session)
    }

    async fn stop_session(
        &self,
        user_id: &str,
        delete_credentials: bool,
    ) -> Result<(), UniboxError> {
        let Some((_, handle)) = self.sessions.remove(user_id) else {
            return Err(UniboxError::NotFound {
                user_id: user_id.to_string(),
            });
        };

        let mut inner = handle.inner.lock().await;
        inner.cancel_timers();
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if let Some(client) = inner.client.take() {
            let result = if delete_credentials {
                client.logout().await
            } else {
                client.destroy().await
            };
            if let Err(e) = result {
                warn!(user_id = %user_id, error = %e, "client teardown failed during stop");
            }
        }
        inner.machine.clear_qr();
        inner.machine.transition(SessionStatus::Disconnected);
        drop(inner);

        self.persist(
            user_id,
            StatusUpdate::status(SessionStatus::Disconnected).clear_qr(),
        )
        .await;
        info!(user_id = %user_id, delete_credentials, "session stopped");
        Ok(())
    }

    async fn cancel_session(&self, user_id: &str) -> Result<(), UniboxError> {
        let Some(handle) = self.handle(user_id) else {
            return Err(UniboxError::NotFound {
                user_id: user_id.to_string(),
            });
        };

        let mut inner = handle.inner.lock().await;
        let status = inner.machine.status();
        if !matches!(
            status,
            SessionStatus::QrPending | SessionStatus::Initializing
        ) {
            return Err(UniboxError::InvalidState {
                user_id: user_id.to_string(),
                status,
                expected: "initializing or qr_pending",
            });
        }

        inner.cancel_timers();
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if let Some(client) = inner.client.take() {
            // Credentials are deliberately preserved.
            if let Err(e) = client.destroy().await {
                warn!(user_id = %user_id, error = %e, "client destroy failed during cancel");
            }
        }
        inner.machine.clear_qr();
        inner.machine.reset_attempts();
        inner.machine.transition(SessionStatus::Disconnected);
        drop(inner);

        self.sessions.remove(user_id);
        self.persist(
            user_id,
            StatusUpdate::status(SessionStatus::Disconnected)
                .with_error("pairing cancelled")
                .clear_qr(),
        )
        .await;
        info!(user_id = %user_id, "pairing cancelled");
        Ok(())
    }

    async fn session_status(&self, user_id: &str) -> Result<SessionSnapshot, UniboxError> {
        let Some(handle) = self.handle(user_id) else {
            return Err(UniboxError::NotFound {
                user_id: user_id.to_string(),
            });
        };
        let inner = handle.inner.lock().await;
        Ok(inner.machine.snapshot())
    }

    async fn pairing_code(&self, user_id: &str) -> Result<Option<String>, UniboxError> {
        let Some(handle) = self.handle(user_id) else {
            return Err(UniboxError::NotFound {
                user_id: user_id.to_string(),
            });
        };
        let inner = handle.inner.lock().await;
        if inner.machine.status() == SessionStatus::QrPending {
            Ok(inner.machine.qr_code().map(str::to_string))
        } else {
            Ok(None)
        }
    }

    async fn channels(&self, user_id: &str) -> Result<Vec<ChannelInfo>, UniboxError> {
        let Some(handle) = self.handle(user_id) else {
            return Err(UniboxError::NotFound {
                user_id: user_id.to_string(),
            });
        };
        let client = {
            let inner = handle.inner.lock().await;
            let status = inner.machine.status();
            if status != SessionStatus::Connected {
                return Err(UniboxError::InvalidState {
                    user_id: user_id.to_string(),
                    status,
                    expected: "connected",
                });
            }
            inner.client.clone()
        };
        match client {
            Some(client) => client.list_channels().await,
            None => Err(UniboxError::Internal(format!(
                "connected session for {user_id} has no client handle"
            ))),
        }
    }

    async fn restore_sessions(self: &Arc<Self>) -> Result<usize, UniboxError> {
        let records = self
            .status_store
            .list_by_status(SessionStatus::Connected)
            .await?;
        let count = records.len();
        info!(count, "restoring previously connected sessions");
        for record in records {
            let registry = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = registry
                    .start_session(&record.user_id, &record.company_id)
                    .await
                {
                    warn!(user_id = %record.user_id, error = %e, "session restore failed");
                }
            });
        }
        Ok(count)
    }

    async fn shutdown(&self) {
        let handles: Vec<Arc<SessionHandle>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.sessions.clear();

        for handle in &handles {
            let mut inner = handle.inner.lock().await;
            inner.cancel_timers();
            if let Some(pump) = inner.pump.take() {
                pump.abort();
            }
            if let Some(client) = inner.client.take() {
                if let Err(e) = client.destroy().await {
                    warn!(
                        user_id = %handle.user_id,
                        error = %e,
                        "client destroy failed during shutdown"
                    );
                }
            }
        }
        info!(count = handles.len(), "registry shut down");
    }

    fn spawn_pump(
        self: &Arc<Self>,
        user_id: String,
        mut events: mpsc::Receiver<ClientEvent>,
    ) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                registry.handle_event(&user_id, event).await;
            }
            debug!(user_id = %user_id, "event pump finished");
        })
    }

    async fn handle_event(self: &Arc<Self>, user_id: &str, event: ClientEvent) {
        let Some(handle) = self.handle(user_id) else {
            debug!(user_id = %user_id, "event for unknown session ignored");
            return;
        };
        match event {
            ClientEvent::PairingCode { code } => self.on_pairing_code(&handle, code).await,
            ClientEvent::Authenticated => self.on_authenticated(&handle).await,
            ClientEvent::Ready {
                phone,
                display_name,
            } => self.on_ready(&handle, phone, display_name).await,
            ClientEvent::Disconnected { reason } => self.on_disconnected(&handle, &reason).await,
            ClientEvent::AuthFailure { reason } => self.on_auth_failure(&handle, &reason).await,
            ClientEvent::StateChanged { state } => {
                debug!(user_id = %user_id, state = %state, "connectivity state changed");
            }
            ClientEvent::Message { message } | ClientEvent::MessageSent { message } => {
                self.on_message(&handle, message).await;
            }
        }
    }

    async fn on_pairing_code(self: &Arc<Self>, handle: &Arc<SessionHandle>, code: String) {
        let user_id = handle.user_id.clone();
        let mut inner = handle.inner.lock().await;

        if inner.machine.status() != SessionStatus::QrPending
            && !inner.machine.transition(SessionStatus::QrPending)
        {
            return;
        }
        inner.machine.set_qr(&code);

        // The expiry window spans the whole pairing attempt; a refreshed
        // code does not re-arm it.
        if inner.qr_timer.is_none() {
            let token = CancellationToken::new();
            inner.qr_timer = Some(token.clone());
            self.arm_qr_timer(&user_id, token);
        }
        drop(inner);

        self.persist(
            &user_id,
            StatusUpdate::status(SessionStatus::QrPending).with_qr(&code),
        )
        .await;
        info!(user_id = %user_id, "pairing code issued");
    }

    async fn on_authenticated(&self, handle: &Arc<SessionHandle>) {
        let user_id = handle.user_id.clone();
        let mut inner = handle.inner.lock().await;

        if let Some(token) = inner.qr_timer.take() {
            token.cancel();
        }
        if !inner.machine.transition(SessionStatus::Authenticating) {
            return;
        }
        inner.machine.clear_qr();
        inner.machine.reset_attempts();
        drop(inner);

        self.persist(
            &user_id,
            StatusUpdate::status(SessionStatus::Authenticating).clear_qr(),
        )
        .await;
        info!(user_id = %user_id, "pairing code scanned");
    }

    async fn on_ready(
        self: &Arc<Self>,
        handle: &Arc<SessionHandle>,
        phone: String,
        display_name: String,
    ) {
        let user_id = handle.user_id.clone();
        let mut inner = handle.inner.lock().await;

        if !inner.machine.transition(SessionStatus::Connected) {
            return;
        }
        inner.machine.set_identity(&phone, &display_name);
        inner.machine.clear_qr();
        inner.machine.reset_attempts();

        // Idempotent heartbeat start: revoke any previous task first.
        if let Some(token) = inner.heartbeat.take() {
            token.cancel();
        }
        if let Some(client) = inner.client.clone() {
            let token = CancellationToken::new();
            inner.heartbeat = Some(token.clone());
            heartbeat::spawn(
                Arc::downgrade(self),
                user_id.clone(),
                client,
                Duration::from_secs(self.config.heartbeat_interval_secs),
                token,
            );
        }
        drop(inner);

        self.persist(
            &user_id,
            StatusUpdate::status(SessionStatus::Connected)
                .with_identity(&phone, &display_name)
                .clear_qr()
                .clear_error(),
        )
        .await;
        info!(user_id = %user_id, phone = %phone, "session connected");
    }

    async fn on_disconnected(self: &Arc<Self>, handle: &Arc<SessionHandle>, reason: &str) {
        if recoverable_disconnect(reason) {
            let mut inner = handle.inner.lock().await;
            if !inner.machine.transition(SessionStatus::Disconnected) {
                return;
            }
            if let Some(token) = inner.heartbeat.take() {
                token.cancel();
            }
            self.schedule_reconnect(handle, &mut inner, reason).await;
        } else {
            info!(
                user_id = %handle.user_id,
                reason = %reason,
                "non-recoverable disconnect, discarding credentials"
            );
            self.teardown_with_logout(handle, SessionStatus::Disconnected, reason)
                .await;
        }
    }

    async fn on_auth_failure(self: &Arc<Self>, handle: &Arc<SessionHandle>, reason: &str) {
        warn!(user_id = %handle.user_id, reason = %reason, "authentication failed");
        self.teardown_with_logout(handle, SessionStatus::Error, reason)
            .await;
    }

    /// Full teardown for unrecoverable endings: credentials are deleted and
    /// a fresh pairing is required. The pump is left to drain on its own
    /// since this may be running inside it.
    async fn teardown_with_logout(
        &self,
        handle: &Arc<SessionHandle>,
        status: SessionStatus,
        reason: &str,
    ) {
        let user_id = handle.user_id.clone();
        let mut inner = handle.inner.lock().await;
        inner.cancel_timers();
        if let Some(client) = inner.client.take() {
            if let Err(e) = client.logout().await {
                warn!(user_id = %user_id, error = %e, "client logout failed during teardown");
            }
        }
        inner.machine.clear_qr();
        inner.machine.transition(status);
        drop(inner);

        self.sessions.remove(&user_id);
        self.persist(
            &user_id,
            StatusUpdate::status(status).with_error(reason).clear_qr(),
        )
        .await;
    }

    /// Entry point for heartbeat-driven disconnects. Re-checks the status
    /// under the session lock: a probe that raced an in-flight reconnect or
    /// stop is a no-op.
    pub(crate) async fn transient_disconnect(self: &Arc<Self>, user_id: &str, reason: &str) {
        let Some(handle) = self.handle(user_id) else {
            return;
        };
        let mut inner = handle.inner.lock().await;
        if inner.machine.status() != SessionStatus::Connected {
            debug!(
                user_id = %user_id,
                status = %inner.machine.status(),
                "stale heartbeat disconnect ignored"
            );
            return;
        }
        if let Some(token) = inner.heartbeat.take() {
            token.cancel();
        }
        inner.machine.transition(SessionStatus::Disconnected);
        self.schedule_reconnect(&handle, &mut inner, reason).await;
    }

    /// Arms the next reconnect attempt, or finalizes the session when the
    /// attempt budget is spent. Caller holds the session lock.
    async fn schedule_reconnect(
        self: &Arc<Self>,
        handle: &Arc<SessionHandle>,
        inner: &mut SessionInner,
        reason: &str,
    ) {
        let user_id = handle.user_id.clone();
        if inner.reconnect.is_some() {
            debug!(user_id = %user_id, "reconnect already pending");
            return;
        }

        let attempt = inner.machine.attempts();
        if attempt >= self.config.max_reconnect_attempts {
            info!(
                user_id = %user_id,
                attempts = attempt,
                "reconnect attempts exhausted, session removed"
            );
            inner.cancel_timers();
            if let Some(client) = inner.client.take() {
                if let Err(e) = client.destroy().await {
                    warn!(user_id = %user_id, error = %e, "client destroy failed at finalization");
                }
            }
            self.sessions.remove(&user_id);
            self.persist(
                &user_id,
                StatusUpdate::status(SessionStatus::Disconnected)
                    .with_error("manual reconnection required")
                    .clear_qr(),
            )
            .await;
            return;
        }

        let delay = reconnect::backoff_delay(
            attempt,
            self.config.reconnect_base_delay_ms,
            self.config.reconnect_max_delay_ms,
        );
        inner.machine.bump_attempts();

        self.persist(
            &user_id,
            StatusUpdate::status(SessionStatus::Disconnected).with_error(reason),
        )
        .await;

        let token = CancellationToken::new();
        inner.reconnect = Some(token.clone());
        reconnect::spawn(Arc::downgrade(self), user_id.clone(), delay, token);
        info!(
            user_id = %user_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            reason = %reason,
            "reconnect scheduled"
        );
    }

    /// Reconnect timer fired: replace the stale client with a fresh one
    /// that re-uses persisted pairing credentials.
    pub(crate) async fn fire_reconnect(self: &Arc<Self>, user_id: &str) {
        let Some(handle) = self.handle(user_id) else {
            return;
        };
        let mut inner = handle.inner.lock().await;
        inner.reconnect = None;
        if inner.machine.status() != SessionStatus::Disconnected {
            debug!(user_id = %user_id, "stale reconnect timer ignored");
            return;
        }

        if let Some(client) = inner.client.take() {
            if let Err(e) = client.destroy().await {
                warn!(user_id = %user_id, error = %e, "stale client destroy failed");
            }
        }
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if !inner.machine.transition(SessionStatus::Initializing) {
            return;
        }
        self.persist(user_id, StatusUpdate::status(SessionStatus::Initializing))
            .await;

        match self.connect_client(user_id).await {
            Ok(session) => {
                inner.client = Some(session.client);
                inner.pump = Some(self.spawn_pump(user_id.to_string(), session.events));
                info!(
                    user_id = %user_id,
                    attempt = inner.machine.attempts(),
                    "reconnect attempt started"
                );
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "reconnect attempt failed");
                inner.machine.transition(SessionStatus::Disconnected);
                self.schedule_reconnect(&handle, &mut inner, "reconnect attempt failed")
                    .await;
            }
        }
    }

    fn arm_qr_timer(self: &Arc<Self>, user_id: &str, token: CancellationToken) {
        let registry = Arc::downgrade(self);
        let user_id = user_id.to_string();
        let timeout = Duration::from_secs(self.config.qr_timeout_secs);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(timeout) => {}
            }
            if let Some(registry) = registry.upgrade() {
                registry.expire_qr(&user_id).await;
            }
        });
    }

    /// QR timer fired while still pairing: tear the session down. No
    /// auto-reconnect; pairing must be re-initiated by the user. Cached
    /// credentials (none exist yet for a first pairing) are preserved.
    async fn expire_qr(self: &Arc<Self>, user_id: &str) {
        let Some(handle) = self.handle(user_id) else {
            return;
        };
        let mut inner = handle.inner.lock().await;
        if inner.machine.status() != SessionStatus::QrPending {
            return;
        }
        inner.cancel_timers();
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        if let Some(client) = inner.client.take() {
            if let Err(e) = client.destroy().await {
                warn!(user_id = %user_id, error = %e, "client destroy failed at QR expiry");
            }
        }
        inner.machine.clear_qr();
        inner.machine.transition(SessionStatus::Disconnected);
        drop(inner);

        self.sessions.remove(user_id);
        self.persist(
            user_id,
            StatusUpdate::status(SessionStatus::Disconnected)
                .with_error("QR code expired")
                .clear_qr(),
        )
        .await;
        info!(user_id = %user_id, "pairing window expired, session removed");
    }

    async fn on_message(&self, handle: &Arc<SessionHandle>, message: ChatMessage) {
        let user_id = handle.user_id.clone();
        let (company_id, client) = {
            let inner = handle.inner.lock().await;
            (inner.machine.company_id().to_string(), inner.client.clone())
        };

        match self
            .channel_directory
            .monitored(&user_id, &message.channel_id)
            .await
        {
            Ok(Some(channel)) if channel.is_monitoring => {}
            Ok(_) => {
                debug!(
                    user_id = %user_id,
                    channel_id = %message.channel_id,
                    "message in unmonitored channel skipped"
                );
                return;
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "monitored-channel lookup failed");
                return;
            }
        }

        let (storage_key, download_url) = if message.has_media {
            match &client {
                Some(client) => match self
                    .media
                    .ingest(client.as_ref(), &company_id, &message)
                    .await
                {
                    Some((key, url)) => (Some(key), Some(url)),
                    None => (None, None),
                },
                None => (None, None),
            }
        } else {
            (None, None)
        };

        let record = IngestedMessage {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            company_id,
            channel_id: message.channel_id,
            channel_name: message.channel_name,
            sender_name: message.sender_name,
            sender_number: message.sender_number,
            body: message.body,
            has_media: message.has_media,
            media_type: message.mime_type,
            storage_key,
            download_url,
            from_me: message.from_me,
            source_timestamp: message.timestamp,
            ingested_at: chrono::Utc::now().to_rfc3339(),
        };

        if let Err(e) = self.message_store.insert_message(&record).await {
            warn!(user_id = %user_id, error = %e, "message persistence failed");
        } else {
            debug!(
                user_id = %user_id,
                channel_id = %record.channel_id,
                has_media = record.has_media,
                "message ingested"
            );
        }
    }

    pub(crate) async fn touch_heartbeat(&self, user_id: &str) {
        let update = StatusUpdate {
            last_heartbeat_at: Some(chrono::Utc::now().to_rfc3339()),
            ..StatusUpdate::default()
        };
        self.persist(user_id, update).await;
    }

    /// Status-store failures never interrupt the lifecycle; they are logged
    /// and the in-memory state stays authoritative.
    async fn persist(&self, user_id: &str, update: StatusUpdate) {
        if let Err(e) = self.status_store.upsert(user_id, update).await {
            warn!(user_id = %user_id, error = %e, "status persistence failed");
        }
    }
}
