// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session status row operations with merge-style upsert semantics.

use std::str::FromStr;

use rusqlite::params;
use unibox_core::UniboxError;
use unibox_core::types::{SessionRecord, SessionStatus, StatusUpdate};

use crate::database::Database;

/// Raw column tuple for a `session_status` row, before enum parsing.
type RawStatusRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

const SELECT_COLUMNS: &str = "user_id, company_id, status, phone, display_name, qr_code, \
     last_error, last_heartbeat_at, updated_at";

fn map_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawStatusRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn into_record(raw: RawStatusRow) -> Result<SessionRecord, tokio_rusqlite::Error> {
    let status = SessionStatus::from_str(&raw.2)
        .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
    Ok(SessionRecord {
        user_id: raw.0,
        company_id: raw.1,
        status,
        phone: raw.3,
        display_name: raw.4,
        qr_code: raw.5,
        last_error: raw.6,
        last_heartbeat_at: raw.7,
        updated_at: raw.8,
    })
}

/// Merge-upsert the status row for a user.
///
/// Fields absent from the update keep their stored value. The read-merge-
/// write runs inside the single writer thread, so concurrent updates from
/// different sessions serialize cleanly and never clobber unrelated columns.
pub async fn upsert_status(
    db: &Database,
    user_id: &str,
    update: StatusUpdate,
) -> Result<(), UniboxError> {
    let user_id = user_id.to_string();
    let now = chrono::Utc::now().to_rfc3339();
    db.connection()
        .call(move |conn| {
            let existing = {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM session_status WHERE user_id = ?1"
                ))?;
                match stmt.query_row(params![user_id], map_raw_row) {
                    Ok(raw) => Some(raw),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let (company_id, status, phone, display_name, qr_code, last_error, last_heartbeat_at) =
                match existing {
                    Some(raw) => (raw.1, raw.2, raw.3, raw.4, raw.5, raw.6, raw.7),
                    None => (
                        String::new(),
                        SessionStatus::Uninitialized.to_string(),
                        None,
                        None,
                        None,
                        None,
                        None,
                    ),
                };

            let company_id = update.company_id.unwrap_or(company_id);
            let status = update.status.map(|s| s.to_string()).unwrap_or(status);
            let phone = update.phone.map(Some).unwrap_or(phone);
            let display_name = update.display_name.map(Some).unwrap_or(display_name);
            let qr_code = update.qr_code.unwrap_or(qr_code);
            let last_error = update.last_error.unwrap_or(last_error);
            let last_heartbeat_at = update.last_heartbeat_at.map(Some).unwrap_or(last_heartbeat_at);

            conn.execute(
                "INSERT OR REPLACE INTO session_status \
                 (user_id, company_id, status, phone, display_name, qr_code, \
                  last_error, last_heartbeat_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user_id,
                    company_id,
                    status,
                    phone,
                    display_name,
                    qr_code,
                    last_error,
                    last_heartbeat_at,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the status row for a user.
pub async fn get_status(db: &Database, user_id: &str) -> Result<Option<SessionRecord>, UniboxError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM session_status WHERE user_id = ?1"
            ))?;
            match stmt.query_row(params![user_id], map_raw_row) {
                Ok(raw) => Ok(Some(into_record(raw)?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all status rows with the given status.
pub async fn list_by_status(
    db: &Database,
    status: SessionStatus,
) -> Result<Vec<SessionRecord>, UniboxError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM session_status \
                 WHERE status = ?1 ORDER BY user_id"
            ))?;
            let rows = stmt.query_map(params![status], map_raw_row)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(into_record(row?)?);
            }
            Ok(records)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
