//! Persistent review ledger for coderev.
//!
//! This crate is the single source of truth for review history. It owns five
//! tables (modules, runs, snapshots, messages, reviews) and enforces the
//! invariants the incremental pipeline depends on:
//!
//! - `snapshots.fingerprint` is globally unique: once a content version has
//!   been reviewed, no second snapshot can exist for those bytes.
//! - `modules.path` is unique: one row per tracked file, however many times
//!   it is discovered or its content changes.
//! - Writes and their read-back happen inside one transaction, so callers
//!   never observe an entity without its generated id.
//!
//! # Usage
//!
//! ```rust,ignore
//! use coderev_db::CoderevDb;
//!
//! let db = CoderevDb::open("~/.coderev/coderev.sqlite3").await?;
//! let module = db.get_module_by_path("/src/lib.py").await?;
//! ```

mod error;
mod schema;
mod store;
mod types;

pub use error::{DbError, Result};
pub use types::{LogEntry, Module, Run, Snapshot};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::info;

/// Handle to the review ledger.
///
/// Cheap to clone; all clones share one connection pool. The ledger assumes
/// a single writing process (see the check-then-insert contract on
/// [`CoderevDb::insert_module`] and [`CoderevDb::insert_snapshot`]).
#[derive(Clone)]
pub struct CoderevDb {
    pool: SqlitePool,
}

impl CoderevDb {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Review ledger opened");

        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::not_found(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let url = format!("sqlite:{}?mode=rw", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the underlying connection pool (escape hatch for ad hoc queries).
    ///
    /// Prefer the typed methods.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}
