// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnection backoff policy and timer task.

use std::sync::Weak;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::registry::RegistryInner;

/// Exponential backoff with a hard ceiling: `min(base * 2^attempt, max)`.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

/// Arms a one-shot reconnect timer for a user.
///
/// The token is stored in the session handle; cancelling it before the
/// delay elapses guarantees the attempt never fires. The registry is held
/// weakly so a dropped registry tears the timer down with it.
pub(crate) fn spawn(
    registry: Weak<RegistryInner>,
    user_id: String,
    delay: Duration,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {
                debug!(user_id = %user_id, "reconnect timer cancelled");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
        if let Some(registry) = registry.upgrade() {
            registry.fire_reconnect(&user_id).await;
        }
    });
}
