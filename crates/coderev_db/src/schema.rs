//! Database schema creation for the review ledger.
//!
//! All CREATE TABLE statements live here - single source of truth.
//!
//! The dedup invariant is enforced at the storage layer: `snapshots.fingerprint`
//! and `modules.path` carry UNIQUE constraints, so a bypassed check-then-insert
//! surfaces as a constraint violation instead of silently corrupting history.

use crate::error::Result;
use crate::CoderevDb;
use tracing::info;

impl CoderevDb {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // WAL mode so readers never observe a half-committed write
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(self.pool())
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(self.pool())
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(self.pool())
            .await?;

        // Modules: tracked source paths and their review history pointers.
        // The snapshot pointers reference rows created later in the same
        // process; SQLite resolves foreign keys at DML time.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS modules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                first_reviewed INTEGER NOT NULL,
                last_reviewed INTEGER NOT NULL,
                first_snapshot INTEGER REFERENCES snapshots(id),
                last_snapshot INTEGER REFERENCES snapshots(id)
            )"#,
        )
        .execute(self.pool())
        .await?;

        // Runs: audit trail of pipeline invocations (never read back by
        // later runs)
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                files TEXT NOT NULL
            )"#,
        )
        .execute(self.pool())
        .await?;

        // Snapshots: one row per distinct content version, keyed by
        // fingerprint
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fingerprint TEXT NOT NULL UNIQUE,
                timestamp INTEGER NOT NULL,
                summary TEXT NOT NULL,
                module_id INTEGER NOT NULL REFERENCES modules(id)
            )"#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_snapshots_module ON snapshots(module_id)",
        )
        .execute(self.pool())
        .await?;

        // Messages and reviews: append-only free-form logs
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                content TEXT NOT NULL
            )"#,
        )
        .execute(self.pool())
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS reviews (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                content TEXT NOT NULL
            )"#,
        )
        .execute(self.pool())
        .await?;

        info!("Database schema verified");
        Ok(())
    }
}
