// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Unibox session bridge.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a per-user automation session.
///
/// Persisted as the lowercase snake-case string (e.g. `qr_pending`) in the
/// status store, so polling clients and restart recovery read the same
/// vocabulary the registry uses in memory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Uninitialized,
    Initializing,
    QrPending,
    Authenticating,
    Connected,
    Disconnected,
    Error,
}

impl SessionStatus {
    /// Terminal statuses are removed from the registry; a new start request
    /// for a user in a terminal status creates a fresh session.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Disconnected | SessionStatus::Error)
    }
}

/// Low-level connectivity state reported by the protocol client.
///
/// Mirrors the states the browser-automation layer exposes; the heartbeat
/// monitor treats `Unpaired`, `UnpairedIdle`, and `Unlaunched` as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectivityState {
    Connected,
    Opening,
    Pairing,
    Timeout,
    Conflict,
    Unpaired,
    UnpairedIdle,
    Unlaunched,
    ProxyBlock,
    TosBlock,
}

/// Lifecycle and message events emitted by a protocol client.
///
/// Events for one session are delivered in emission order over a single
/// mpsc channel; the state machine consumes them strictly in that order.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A one-time pairing code was generated (or refreshed) for QR display.
    PairingCode { code: String },
    /// The pairing code was scanned by the user's device.
    Authenticated,
    /// The session is fully connected and the account identity is known.
    Ready { phone: String, display_name: String },
    /// The client lost its connection; `reason` drives recoverability
    /// classification.
    Disconnected { reason: String },
    /// Unrecoverable authentication failure; cached pairing credentials are
    /// no longer valid.
    AuthFailure { reason: String },
    /// Low-level connectivity state change (informational).
    StateChanged { state: ConnectivityState },
    /// An inbound message arrived in a chat visible to the paired account.
    Message { message: ChatMessage },
    /// A message was sent from the paired account (possibly from the phone).
    MessageSent { message: ChatMessage },
}

/// A chat message as reported by the protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Protocol-level message reference, used for media download.
    pub id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub sender_name: String,
    pub sender_number: String,
    pub body: String,
    pub has_media: bool,
    /// MIME type of the attachment, when `has_media` is set.
    pub mime_type: Option<String>,
    /// Source timestamp in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub from_me: bool,
}

/// A message record persisted to the unified inbox. Never mutated after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedMessage {
    pub id: String,
    pub user_id: String,
    pub company_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub sender_name: String,
    pub sender_number: String,
    pub body: String,
    pub has_media: bool,
    pub media_type: Option<String>,
    /// Blob storage key; `None` when the message had no media or the media
    /// pipeline failed.
    pub storage_key: Option<String>,
    pub download_url: Option<String>,
    pub from_me: bool,
    /// Source timestamp in milliseconds since the Unix epoch.
    pub source_timestamp: i64,
    /// RFC 3339 ingestion timestamp.
    pub ingested_at: String,
}

/// A group/conversation flagged for ingestion into the unified inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoredChannel {
    pub user_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub is_monitoring: bool,
}

/// A channel visible to the paired account, as listed by the protocol client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub participant_count: u32,
}

/// In-memory session view returned to polling clients. Never touches the
/// durable store.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    /// Present only while the session is `qr_pending`.
    pub qr_code: Option<String>,
}

/// Durable session status row, keyed by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub company_id: String,
    pub status: SessionStatus,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    pub qr_code: Option<String>,
    pub last_error: Option<String>,
    /// RFC 3339 timestamp of the last healthy heartbeat probe.
    pub last_heartbeat_at: Option<String>,
    pub updated_at: String,
}

/// Partial update applied to a session status row with merge semantics.
///
/// `None` leaves a column untouched. The doubly-optional fields distinguish
/// "leave as is" (`None`) from "clear to NULL" (`Some(None)`), which the
/// lifecycle needs when a pairing code or error is consumed.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub company_id: Option<String>,
    pub status: Option<SessionStatus>,
    pub phone: Option<String>,
    pub display_name: Option<String>,
    pub qr_code: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
    pub last_heartbeat_at: Option<String>,
}

impl StatusUpdate {
    /// Update carrying only a status change.
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_company(mut self, company_id: &str) -> Self {
        self.company_id = Some(company_id.to_string());
        self
    }

    pub fn with_qr(mut self, code: &str) -> Self {
        self.qr_code = Some(Some(code.to_string()));
        self
    }

    pub fn clear_qr(mut self) -> Self {
        self.qr_code = Some(None);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.last_error = Some(Some(reason.to_string()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }

    pub fn with_identity(mut self, phone: &str, display_name: &str) -> Self {
        self.phone = Some(phone.to_string());
        self.display_name = Some(display_name.to_string());
        self
    }
}

/// Raw media bytes downloaded from the protocol client.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// A time-bounded link for retrieving a stored blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalLink {
    pub url: String,
    pub expires_in_secs: u64,
}
