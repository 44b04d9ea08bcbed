// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementations mirroring the SQLite adapter's
//! semantics, for tests that should not touch the filesystem.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use unibox_core::types::{
    IngestedMessage, MonitoredChannel, SessionRecord, SessionStatus, StatusUpdate,
};
use unibox_core::{ChannelDirectory, MessageStore, StatusStore, UniboxError};

/// In-memory status store with the same merge-upsert semantics as the
/// SQLite adapter. Writes can be made to fail to exercise the lifecycle's
/// log-and-continue persistence policy.
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: Mutex<HashMap<String, SessionRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a row, e.g. for restore-on-boot tests.
    pub async fn seed(&self, record: SessionRecord) {
        self.rows.lock().await.insert(record.user_id.clone(), record);
    }

    pub async fn record(&self, user_id: &str) -> Option<SessionRecord> {
        self.rows.lock().await.get(user_id).cloned()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn upsert(&self, user_id: &str, update: StatusUpdate) -> Result<(), UniboxError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(UniboxError::Storage {
                source: "injected status write failure".into(),
            });
        }
        let mut rows = self.rows.lock().await;
        let record = rows
            .entry(user_id.to_string())
            .or_insert_with(|| SessionRecord {
                user_id: user_id.to_string(),
                company_id: String::new(),
                status: SessionStatus::Uninitialized,
                phone: None,
                display_name: None,
                qr_code: None,
                last_error: None,
                last_heartbeat_at: None,
                updated_at: String::new(),
            });

        if let Some(company_id) = update.company_id {
            record.company_id = company_id;
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        if let Some(phone) = update.phone {
            record.phone = Some(phone);
        }
        if let Some(display_name) = update.display_name {
            record.display_name = Some(display_name);
        }
        if let Some(qr_code) = update.qr_code {
            record.qr_code = qr_code;
        }
        if let Some(last_error) = update.last_error {
            record.last_error = last_error;
        }
        if let Some(at) = update.last_heartbeat_at {
            record.last_heartbeat_at = Some(at);
        }
        record.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(())
    }

    async fn get(&self, user_id: &str) -> Result<Option<SessionRecord>, UniboxError> {
        Ok(self.rows.lock().await.get(user_id).cloned())
    }

    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, UniboxError> {
        let rows = self.rows.lock().await;
        let mut records: Vec<SessionRecord> = rows
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(records)
    }
}

/// Captures ingested messages for assertion.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: Mutex<Vec<IngestedMessage>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<IngestedMessage> {
        self.messages.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert_message(&self, message: &IngestedMessage) -> Result<(), UniboxError> {
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}

/// Fixed monitored-channel lookup table.
#[derive(Default)]
pub struct StaticChannelDirectory {
    channels: Mutex<HashMap<(String, String), MonitoredChannel>>,
}

impl StaticChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel as monitored (or explicitly unmonitored).
    pub async fn add(&self, user_id: &str, channel_id: &str, channel_name: &str, monitoring: bool) {
        self.channels.lock().await.insert(
            (user_id.to_string(), channel_id.to_string()),
            MonitoredChannel {
                user_id: user_id.to_string(),
                channel_id: channel_id.to_string(),
                channel_name: channel_name.to_string(),
                is_monitoring: monitoring,
            },
        );
    }
}

#[async_trait]
impl ChannelDirectory for StaticChannelDirectory {
    async fn monitored(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Option<MonitoredChannel>, UniboxError> {
        Ok(self
            .channels
            .lock()
            .await
            .get(&(user_id.to_string(), channel_id.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn status_upsert_merges_like_sqlite() {
        let store = MemoryStatusStore::new();
        store
            .upsert(
                "u1",
                StatusUpdate::status(SessionStatus::QrPending)
                    .with_company("co-1")
                    .with_qr("2@abc"),
            )
            .await
            .unwrap();
        store
            .upsert(
                "u1",
                StatusUpdate::status(SessionStatus::Authenticating).clear_qr(),
            )
            .await
            .unwrap();

        let record = store.record("u1").await.unwrap();
        assert_eq!(record.status, SessionStatus::Authenticating);
        assert_eq!(record.company_id, "co-1");
        assert!(record.qr_code.is_none());
    }

    #[tokio::test]
    async fn injected_write_failures_surface() {
        let store = MemoryStatusStore::new();
        store.set_fail_writes(true);
        assert!(
            store
                .upsert("u1", StatusUpdate::status(SessionStatus::Connected))
                .await
                .is_err()
        );
        assert!(store.record("u1").await.is_none());
    }

    #[tokio::test]
    async fn directory_distinguishes_unmonitored_from_unknown() {
        let dir = StaticChannelDirectory::new();
        dir.add("u1", "c1", "Ops", true).await;
        dir.add("u1", "c2", "Noise", false).await;

        assert!(dir.monitored("u1", "c1").await.unwrap().unwrap().is_monitoring);
        assert!(!dir.monitored("u1", "c2").await.unwrap().unwrap().is_monitoring);
        assert!(dir.monitored("u1", "c3").await.unwrap().is_none());
    }
}
