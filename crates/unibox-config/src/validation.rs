// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and coherent backoff bounds.

use crate::diagnostic::ConfigError;
use crate::model::UniboxConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &UniboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.media.root_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "media.root_dir must not be empty".to_string(),
        });
    }

    if config.session.qr_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.qr_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.session.heartbeat_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.heartbeat_interval_secs must be at least 1".to_string(),
        });
    }

    if config.session.max_reconnect_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "session.max_reconnect_attempts must be at least 1".to_string(),
        });
    }

    if config.session.reconnect_base_delay_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "session.reconnect_base_delay_ms must be at least 1".to_string(),
        });
    }

    if config.session.reconnect_max_delay_ms < config.session.reconnect_base_delay_ms {
        errors.push(ConfigError::Validation {
            message: format!(
                "session.reconnect_max_delay_ms ({}) must not be below reconnect_base_delay_ms ({})",
                config.session.reconnect_max_delay_ms, config.session.reconnect_base_delay_ms
            ),
        });
    }

    let level = config.log.level.trim();
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{level}` is not one of trace, debug, info, warn, error"
            ),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
