// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./unibox.toml` > `~/.config/unibox/unibox.toml` > `/etc/unibox/unibox.toml`
//! with environment variable overrides via `UNIBOX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::UniboxConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/unibox/unibox.toml` (system-wide)
/// 3. `~/.config/unibox/unibox.toml` (user XDG config)
/// 4. `./unibox.toml` (local directory)
/// 5. `UNIBOX_*` environment variables
pub fn load_config() -> Result<UniboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(UniboxConfig::default()))
        .merge(Toml::file("/etc/unibox/unibox.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("unibox/unibox.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("unibox.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<UniboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(UniboxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<UniboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(UniboxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `UNIBOX_SESSION_QR_TIMEOUT_SECS` must map
/// to `session.qr_timeout_secs`, not `session.qr.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("UNIBOX_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("session_", "session.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("media_", "media.", 1)
            .replacen("log_", "log.", 1);
        mapped.into()
    })
}
