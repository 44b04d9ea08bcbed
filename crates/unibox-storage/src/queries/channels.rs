// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monitored-channel registry queries.
//!
//! The lifecycle core only reads these rows; writes come from the
//! channel-management surface that owns subscription CRUD.

use rusqlite::params;
use unibox_core::UniboxError;
use unibox_core::types::MonitoredChannel;

use crate::database::Database;

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MonitoredChannel> {
    Ok(MonitoredChannel {
        user_id: row.get(0)?,
        channel_id: row.get(1)?,
        channel_name: row.get(2)?,
        is_monitoring: row.get(3)?,
    })
}

/// Insert or replace a monitored-channel row.
pub async fn upsert_channel(db: &Database, channel: &MonitoredChannel) -> Result<(), UniboxError> {
    let channel = channel.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO monitored_channels \
                 (user_id, channel_id, channel_name, is_monitoring) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    channel.user_id,
                    channel.channel_id,
                    channel.channel_name,
                    channel.is_monitoring,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the monitored-channel row for a user/channel pair.
pub async fn get_channel(
    db: &Database,
    user_id: &str,
    channel_id: &str,
) -> Result<Option<MonitoredChannel>, UniboxError> {
    let user_id = user_id.to_string();
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, channel_id, channel_name, is_monitoring \
                 FROM monitored_channels WHERE user_id = ?1 AND channel_id = ?2",
            )?;
            match stmt.query_row(params![user_id, channel_id], map_row) {
                Ok(channel) => Ok(Some(channel)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all monitored-channel rows for a user.
pub async fn list_channels(
    db: &Database,
    user_id: &str,
) -> Result<Vec<MonitoredChannel>, UniboxError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, channel_id, channel_name, is_monitoring \
                 FROM monitored_channels WHERE user_id = ?1 ORDER BY channel_name",
            )?;
            let rows = stmt.query_map(params![user_id], map_row)?;
            let mut channels = Vec::new();
            for row in rows {
                channels.push(row?);
            }
            Ok(channels)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
