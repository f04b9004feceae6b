// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use casebot_core::CaseError;
use tracing::debug;

use crate::migrations;

/// The in-memory database marker accepted in `database.url`.
pub const IN_MEMORY: &str = ":memory:";

/// Handle to the case database.
///
/// Wraps a single `tokio_rusqlite::Connection`; every query module accepts
/// `&Database` and runs its closure on the connection's background thread.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `url` with WAL enabled and run migrations.
    pub async fn open(url: &str) -> Result<Self, CaseError> {
        Self::open_with(url, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    ///
    /// `url` may be a plain path, `sqlite://path`, `sqlite:path`, or `:memory:`.
    pub async fn open_with(url: &str, wal_mode: bool) -> Result<Self, CaseError> {
        let path = resolve_database_path(url);

        let conn = if path == IN_MEMORY {
            tokio_rusqlite::Connection::open_in_memory().await
        } else {
            if let Some(parent) = Path::new(&path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CaseError::PersistenceUnavailable {
                        source: Box::new(e),
                    }
                })?;
            }
            tokio_rusqlite::Connection::open(&path).await
        }
        .map_err(|e| map_tr_err(e.into()))?;

        let use_wal = wal_mode && path != IN_MEMORY;
        conn.call(move |conn| -> Result<Result<(), CaseError>, rusqlite::Error> {
            if use_wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            Ok(migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path = %path, wal = use_wal, "database opened");
        Ok(Self { conn })
    }

    /// Returns the underlying connection for query modules.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), CaseError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint and close the connection.
    pub async fn close(self) -> Result<(), CaseError> {
        self.checkpoint().await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Strip the optional `sqlite://` / `sqlite:` scheme from a database URL.
pub fn resolve_database_path(url: &str) -> String {
    let trimmed = url.trim();
    trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed)
        .to_string()
}

/// Current UTC time in the format stored in `created_at`/`updated_at` columns.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Convert tokio-rusqlite errors to `CaseError::PersistenceUnavailable`.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CaseError {
    CaseError::PersistenceUnavailable {
        source: Box::new(e),
    }
}
