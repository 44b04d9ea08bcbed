// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Unibox session bridge.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Unibox workspace: the protocol client
//! seam, the durable status store, unified inbox persistence, and blob
//! storage. The session lifecycle manager in `unibox-session` is written
//! entirely against these traits so it can be driven by synthetic events in
//! tests.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::UniboxError;
pub use types::{ClientEvent, ConnectivityState, SessionSnapshot, SessionStatus, StatusUpdate};

// Re-export all adapter traits at crate root.
pub use traits::{
    BlobStore, ChannelDirectory, ClientFactory, ClientSession, MessageStore, ProtocolClient,
    StatusStore,
};
