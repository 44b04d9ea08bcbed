// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session state machine.
//!
//! All status mutation goes through [`SessionMachine::transition`], which
//! enforces an explicit transition table. A transition not in the table is
//! logged at warn and ignored, so a stale timer or late client event can
//! never move a session backwards.

use chrono::{DateTime, Utc};
use tracing::warn;

use unibox_core::types::{SessionSnapshot, SessionStatus};

/// Disconnect reasons that must never trigger automatic reconnection.
///
/// Matched case-insensitively as substrings of the reason the protocol
/// client reports: an explicit logout from the paired device, a policy
/// block, and a navigation-triggered teardown all mean the cached pairing
/// credentials are no longer trustworthy.
const NON_RECOVERABLE_REASONS: [&str; 3] = ["logout", "blocked", "navigation"];

/// Returns `true` when a disconnect reason is transient and the session
/// should be handed to the reconnection scheduler.
pub fn recoverable_disconnect(reason: &str) -> bool {
    let reason = reason.to_lowercase();
    !NON_RECOVERABLE_REASONS
        .iter()
        .any(|marker| reason.contains(marker))
}

/// In-memory state for one user's session.
///
/// Owned exclusively by the registry's per-session handle; the registry's
/// per-session mutex is the single-writer discipline that keeps `status`,
/// identity, and the attempt counter consistent.
pub struct SessionMachine {
    user_id: String,
    company_id: String,
    status: SessionStatus,
    phone: Option<String>,
    display_name: Option<String>,
    qr_code: Option<String>,
    /// Reconnection attempts scheduled since the last successful pairing.
    attempts: u32,
    created_at: DateTime<Utc>,
    last_transition_at: DateTime<Utc>,
}

impl SessionMachine {
    pub fn new(user_id: &str, company_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            company_id: company_id.to_string(),
            status: SessionStatus::Uninitialized,
            phone: None,
            display_name: None,
            qr_code: None,
            attempts: 0,
            created_at: now,
            last_transition_at: now,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn qr_code(&self) -> Option<&str> {
        self.qr_code.as_deref()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.last_transition_at
    }

    /// Whether `from -> to` appears in the transition table.
    ///
    /// `initializing -> authenticating/connected` covers credential-reuse
    /// restores that skip the QR phase entirely.
    pub fn allowed(from: SessionStatus, to: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (from, to),
            (Uninitialized, Initializing)
                | (Initializing, QrPending)
                | (Initializing, Authenticating)
                | (Initializing, Connected)
                | (Initializing, Disconnected)
                | (Initializing, Error)
                | (QrPending, Authenticating)
                | (QrPending, Disconnected)
                | (QrPending, Error)
                | (Authenticating, Connected)
                | (Authenticating, Disconnected)
                | (Authenticating, Error)
                | (Connected, Disconnected)
                | (Connected, Error)
                | (Disconnected, Initializing)
                | (Disconnected, Error)
        )
    }

    /// Applies a transition if the table permits it. Returns `false` (and
    /// warns) otherwise, leaving the machine untouched.
    pub fn transition(&mut self, to: SessionStatus) -> bool {
        if !Self::allowed(self.status, to) {
            warn!(
                user_id = %self.user_id,
                from = %self.status,
                to = %to,
                "rejected undefined session transition"
            );
            return false;
        }
        self.status = to;
        self.last_transition_at = Utc::now();
        true
    }

    pub fn set_qr(&mut self, code: &str) {
        self.qr_code = Some(code.to_string());
    }

    pub fn clear_qr(&mut self) {
        self.qr_code = None;
    }

    pub fn set_identity(&mut self, phone: &str, display_name: &str) {
        self.phone = Some(phone.to_string());
        self.display_name = Some(display_name.to_string());
    }

    pub fn reset_attempts(&mut self) {
        self.attempts = 0;
    }

    pub fn bump_attempts(&mut self) {
        self.attempts += 1;
    }

    /// In-memory view for polling clients. The pairing code is exposed only
    /// while the session is actually waiting for a scan.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            phone: self.phone.clone(),
            display_name: self.display_name.clone(),
            qr_code: if self.status == SessionStatus::QrPending {
                self.qr_code.clone()
            } else {
                None
            },
        }
    }
}
