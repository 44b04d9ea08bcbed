// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Converts Figment deserialization errors into miette diagnostics so config
//! mistakes render with codes and help text instead of a bare Display chain.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown or mistyped key was found in the configuration.
    #[error("unrecognized configuration key: {detail}")]
    #[diagnostic(
        code(unibox::config::unknown_key),
        help("check the key against the documented [session], [storage], [media], and [log] sections")
    )]
    UnknownKey {
        /// Figment's description of the offending key.
        detail: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(unibox::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(unibox::config::other))]
    Other(String),
}

/// Convert a Figment error (which aggregates one entry per failure) into
/// `ConfigError`s.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| {
            let detail = e.to_string();
            if detail.contains("unknown field") {
                ConfigError::UnknownKey { detail }
            } else {
                ConfigError::Other(detail)
            }
        })
        .collect()
}

/// Render a list of config errors to a human-readable report string.
pub fn render_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
