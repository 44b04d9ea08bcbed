// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for session status, ingested messages, and the
//! monitored-channel registry.

use async_trait::async_trait;

use crate::error::UniboxError;
use crate::types::{IngestedMessage, MonitoredChannel, SessionRecord, SessionStatus, StatusUpdate};

/// Durable, multi-writer-safe session status persistence.
///
/// Upserts carry merge semantics: fields absent from a [`StatusUpdate`]
/// keep their stored value, so concurrent updates from different sessions
/// never collide on unrelated columns.
#[async_trait]
pub trait StatusStore: Send + Sync + 'static {
    /// Merge-upserts the status row for a user.
    async fn upsert(&self, user_id: &str, update: StatusUpdate) -> Result<(), UniboxError>;

    /// Fetches the status row for a user.
    async fn get(&self, user_id: &str) -> Result<Option<SessionRecord>, UniboxError>;

    /// Lists all rows with the given status. Used by restart recovery to
    /// find sessions that were last known connected.
    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, UniboxError>;
}

/// Unified inbox message persistence. Records are insert-only.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    async fn insert_message(&self, message: &IngestedMessage) -> Result<(), UniboxError>;
}

/// Read access to the monitored-channel registry.
///
/// The lifecycle core only reads `is_monitoring` to decide whether an
/// inbound message is persisted; channel CRUD is owned elsewhere.
#[async_trait]
pub trait ChannelDirectory: Send + Sync + 'static {
    async fn monitored(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Option<MonitoredChannel>, UniboxError>;
}
