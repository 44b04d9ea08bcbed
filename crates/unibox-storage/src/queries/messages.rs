// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingested message persistence. Records are insert-only.

use rusqlite::params;
use unibox_core::UniboxError;
use unibox_core::types::IngestedMessage;

use crate::database::Database;

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IngestedMessage> {
    Ok(IngestedMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        company_id: row.get(2)?,
        channel_id: row.get(3)?,
        channel_name: row.get(4)?,
        sender_name: row.get(5)?,
        sender_number: row.get(6)?,
        body: row.get(7)?,
        has_media: row.get(8)?,
        media_type: row.get(9)?,
        storage_key: row.get(10)?,
        download_url: row.get(11)?,
        from_me: row.get(12)?,
        source_timestamp: row.get(13)?,
        ingested_at: row.get(14)?,
    })
}

/// Insert an ingested message.
pub async fn insert_message(db: &Database, message: &IngestedMessage) -> Result<(), UniboxError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages \
                 (id, user_id, company_id, channel_id, channel_name, sender_name, \
                  sender_number, body, has_media, media_type, storage_key, download_url, \
                  from_me, source_timestamp, ingested_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    message.id,
                    message.user_id,
                    message.company_id,
                    message.channel_id,
                    message.channel_name,
                    message.sender_name,
                    message.sender_number,
                    message.body,
                    message.has_media,
                    message.media_type,
                    message.storage_key,
                    message.download_url,
                    message.from_me,
                    message.source_timestamp,
                    message.ingested_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List messages for a user, newest first, optionally scoped to a channel.
pub async fn list_messages(
    db: &Database,
    user_id: &str,
    channel_id: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<IngestedMessage>, UniboxError> {
    let user_id = user_id.to_string();
    let channel_id = channel_id.map(|c| c.to_string());
    let limit = limit.unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut messages = Vec::new();
            match &channel_id {
                Some(channel) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, company_id, channel_id, channel_name, sender_name, \
                         sender_number, body, has_media, media_type, storage_key, download_url, \
                         from_me, source_timestamp, ingested_at \
                         FROM messages WHERE user_id = ?1 AND channel_id = ?2 \
                         ORDER BY source_timestamp DESC LIMIT ?3",
                    )?;
                    let rows = stmt.query_map(params![user_id, channel, limit], map_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, user_id, company_id, channel_id, channel_name, sender_name, \
                         sender_number, body, has_media, media_type, storage_key, download_url, \
                         from_me, source_timestamp, ingested_at \
                         FROM messages WHERE user_id = ?1 \
                         ORDER BY source_timestamp DESC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![user_id, limit], map_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
