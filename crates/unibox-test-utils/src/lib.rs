// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Unibox integration tests.
//!
//! Provides mock adapters and in-memory stores for fast, deterministic,
//! CI-runnable tests without a browser or a database.
//!
//! # Components
//!
//! - [`MockProtocolClient`] / [`MockClientFactory`] - scriptable client
//!   with event injection and call capture
//! - [`MemoryStatusStore`] / [`MemoryMessageStore`] - in-memory persistence
//!   mirroring the SQLite adapter's merge semantics
//! - [`StaticChannelDirectory`] - fixed monitored-channel lookup
//! - [`MockBlobStore`] - blob capture with failure injection

pub mod memory_store;
pub mod mock_blob;
pub mod mock_client;

pub use memory_store::{MemoryMessageStore, MemoryStatusStore, StaticChannelDirectory};
pub use mock_blob::MockBlobStore;
pub use mock_client::{MockClientFactory, MockProtocolClient};
