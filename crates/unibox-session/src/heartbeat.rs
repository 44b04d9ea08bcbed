// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session liveness probe.
//!
//! While a session is connected, a background task polls the protocol
//! client's low-level connectivity state on a fixed interval. A healthy
//! probe touches `last_heartbeat_at` in the status store; an unhealthy one
//! routes the session into the transient-disconnect path, where the
//! registry re-checks the session status under its lock before acting.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use unibox_core::ProtocolClient;
use unibox_core::types::ConnectivityState;

use crate::registry::RegistryInner;

/// Probe-error substrings that mean the underlying browser automation is
/// gone and the session cannot recover without a fresh client.
const FATAL_PROBE_ERRORS: [&str; 4] = [
    "session closed",
    "protocol error",
    "target closed",
    "browser has disconnected",
];

/// Connectivity states that mean the remote device unlinked or the client
/// never launched; both require going through reconnection.
pub fn state_is_unhealthy(state: ConnectivityState) -> bool {
    matches!(
        state,
        ConnectivityState::Unpaired
            | ConnectivityState::UnpairedIdle
            | ConnectivityState::Unlaunched
    )
}

pub fn probe_error_is_fatal(message: &str) -> bool {
    let message = message.to_lowercase();
    FATAL_PROBE_ERRORS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Starts the heartbeat task for one session.
///
/// The task exits on token cancellation, when the registry is dropped, or
/// after routing an unhealthy probe into the disconnect path (the next
/// connect arms a fresh task).
pub(crate) fn spawn(
    registry: Weak<RegistryInner>,
    user_id: String,
    client: Arc<dyn ProtocolClient>,
    interval: Duration,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the probe starts one
        // interval after connect.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(user_id = %user_id, "heartbeat stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let Some(registry) = registry.upgrade() else {
                return;
            };

            match client.connectivity_state().await {
                Ok(state) if state_is_unhealthy(state) => {
                    warn!(
                        user_id = %user_id,
                        state = %state,
                        "heartbeat found session unhealthy"
                    );
                    registry
                        .transient_disconnect(&user_id, &format!("connectivity state {state}"))
                        .await;
                    return;
                }
                Ok(ConnectivityState::Connected) => {
                    registry.touch_heartbeat(&user_id).await;
                }
                Ok(state) => {
                    debug!(user_id = %user_id, state = %state, "heartbeat probe inconclusive");
                }
                Err(e) if probe_error_is_fatal(&e.to_string()) => {
                    warn!(user_id = %user_id, error = %e, "heartbeat probe failed fatally");
                    registry
                        .transient_disconnect(&user_id, &e.to_string())
                        .await;
                    return;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "heartbeat probe failed, will retry");
                }
            }
        }
    });
}
