// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the persistence traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use unibox_config::model::StorageConfig;
use unibox_core::types::{
    IngestedMessage, MonitoredChannel, SessionRecord, SessionStatus, StatusUpdate,
};
use unibox_core::{ChannelDirectory, MessageStore, StatusStore, UniboxError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store implementing [`StatusStore`], [`MessageStore`], and
/// [`ChannelDirectory`].
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily opened on the first call to
/// [`initialize`](SqliteStore::initialize).
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database, apply PRAGMAs, and run migrations.
    pub async fn initialize(&self) -> Result<(), UniboxError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| UniboxError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), UniboxError> {
        self.db()?.close().await
    }

    fn db(&self) -> Result<&Database, UniboxError> {
        self.db.get().ok_or_else(|| UniboxError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Insert or replace a monitored-channel row. Write access is owned by
    /// the channel-management surface; exposed here for that surface and for
    /// tests.
    pub async fn upsert_monitored_channel(
        &self,
        channel: &MonitoredChannel,
    ) -> Result<(), UniboxError> {
        queries::channels::upsert_channel(self.db()?, channel).await
    }

    /// List all monitored-channel rows for a user.
    pub async fn list_monitored_channels(
        &self,
        user_id: &str,
    ) -> Result<Vec<MonitoredChannel>, UniboxError> {
        queries::channels::list_channels(self.db()?, user_id).await
    }

    /// List ingested messages for a user, newest first.
    pub async fn list_messages(
        &self,
        user_id: &str,
        channel_id: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<IngestedMessage>, UniboxError> {
        queries::messages::list_messages(self.db()?, user_id, channel_id, limit).await
    }
}

#[async_trait]
impl StatusStore for SqliteStore {
    async fn upsert(&self, user_id: &str, update: StatusUpdate) -> Result<(), UniboxError> {
        queries::status::upsert_status(self.db()?, user_id, update).await
    }

    async fn get(&self, user_id: &str) -> Result<Option<SessionRecord>, UniboxError> {
        queries::status::get_status(self.db()?, user_id).await
    }

    async fn list_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<SessionRecord>, UniboxError> {
        queries::status::list_by_status(self.db()?, status).await
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn insert_message(&self, message: &IngestedMessage) -> Result<(), UniboxError> {
        queries::messages::insert_message(self.db()?, message).await
    }
}

#[async_trait]
impl ChannelDirectory for SqliteStore {
    async fn monitored(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<Option<MonitoredChannel>, UniboxError> {
        queries::channels::get_channel(self.db()?, user_id, channel_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));

        let result = store.get("user-1").await;
        assert!(result.is_err(), "queries should fail before initialize");
    }

    #[tokio::test]
    async fn full_status_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        store
            .upsert(
                "user-1",
                StatusUpdate::status(SessionStatus::Connected)
                    .with_company("co-1")
                    .with_identity("+15550100", "Ada"),
            )
            .await
            .unwrap();

        let record = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(record.status, SessionStatus::Connected);
        assert_eq!(record.display_name.as_deref(), Some("Ada"));

        let connected = store.list_by_status(SessionStatus::Connected).await.unwrap();
        assert_eq!(connected.len(), 1);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn channel_directory_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("channels.db");
        let store = SqliteStore::new(make_config(db_path.to_str().unwrap()));
        store.initialize().await.unwrap();

        store
            .upsert_monitored_channel(&MonitoredChannel {
                user_id: "user-1".to_string(),
                channel_id: "chan-a".to_string(),
                channel_name: "Ops Team".to_string(),
                is_monitoring: true,
            })
            .await
            .unwrap();

        let channel = store.monitored("user-1", "chan-a").await.unwrap().unwrap();
        assert!(channel.is_monitoring);
        assert!(store.monitored("user-1", "chan-b").await.unwrap().is_none());

        store.close().await.unwrap();
    }
}
