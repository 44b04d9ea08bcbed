// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle core for the Unibox bridge.
//!
//! Manages per-user automation-backed messaging sessions: QR pairing with
//! expiry, exponential-backoff reconnection, heartbeat liveness probing,
//! restart recovery from the durable status store, and ingestion of
//! messages (with media) from monitored channels into the unified inbox.

pub mod heartbeat;
pub mod machine;
pub mod media;
pub mod reconnect;
pub mod registry;

pub use machine::{SessionMachine, recoverable_disconnect};
pub use media::MediaPipeline;
pub use reconnect::backoff_delay;
pub use registry::SessionRegistry;
