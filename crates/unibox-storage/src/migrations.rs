// SPDX-FileCopyrightText: 2026 Unibox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations.
//!
//! The SQL files under `migrations/` are compiled in via refinery's
//! `embed_migrations!` and applied on every database open. Refinery records
//! applied versions in its `refinery_schema_history` table, so opening an
//! up-to-date database is a no-op.

use tracing::info;
use unibox_core::UniboxError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply any pending migrations to the given connection.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), UniboxError> {
    let report = embedded::migrations::runner().run(conn).map_err(|e| {
        UniboxError::Storage {
            source: Box::new(e),
        }
    })?;
    let applied = report.applied_migrations();
    if !applied.is_empty() {
        info!(count = applied.len(), "schema migrations applied");
    }
    Ok(())
}
