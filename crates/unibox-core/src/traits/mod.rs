// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams between the session lifecycle core and its
//! external collaborators: the protocol client, the durable status store,
//! the unified inbox, and blob storage.

pub mod blob;
pub mod client;
pub mod store;

pub use blob::BlobStore;
pub use client::{ClientFactory, ClientSession, ProtocolClient};
pub use store::{ChannelDirectory, MessageStore, StatusStore};
