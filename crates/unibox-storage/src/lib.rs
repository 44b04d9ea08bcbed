// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence and filesystem blob storage for Unibox.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, typed CRUD for
//! session status, ingested messages, and monitored channels, plus a
//! filesystem-backed blob store for media attachments.

pub mod adapter;
pub mod blob;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use blob::FsBlobStore;
pub use database::Database;
