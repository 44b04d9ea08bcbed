// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Unibox session bridge.

use thiserror::Error;

use crate::types::SessionStatus;

/// The primary error type used across all Unibox adapter traits and core operations.
#[derive(Debug, Error)]
pub enum UniboxError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Protocol client errors (handshake failure, navigation error, media download).
    #[error("protocol client error: {message}")]
    Client {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Blob storage errors (upload failure, link generation).
    #[error("blob storage error: {message}")]
    Blob {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The on-disk pairing-credential store for this user is held by another
    /// client instance (typically a stale lock from an unclean shutdown).
    #[error("pairing-credential store for {user_id} is locked by another client")]
    SessionLocked { user_id: String },

    /// The session exists but is not in a state that permits the operation.
    #[error("session for {user_id} is {status}, expected {expected}")]
    InvalidState {
        user_id: String,
        status: SessionStatus,
        expected: &'static str,
    },

    /// No live session exists for the given user.
    #[error("no session for {user_id}")]
    NotFound { user_id: String },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
