//! Insert and lookup operations for the five ledger tables.
//!
//! Every mutating operation runs inside a transaction together with its
//! read-back, so the returned entity always carries its generated id and a
//! partially applied write is never visible.

use crate::error::{DbError, Result};
use crate::types::{LogEntry, Module, Run, Snapshot};
use crate::CoderevDb;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl CoderevDb {
    // ========================================================================
    // Run Operations
    // ========================================================================

    /// Record a pipeline invocation and the ordered file set it considered.
    pub async fn insert_run(&self, timestamp: i64, files: &[String]) -> Result<i64> {
        let files_json = serde_json::to_string(files)?;

        let result = sqlx::query("INSERT INTO runs (timestamp, files) VALUES (?, ?)")
            .bind(timestamp)
            .bind(&files_json)
            .execute(self.pool())
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a run by id.
    pub async fn get_run(&self, id: i64) -> Result<Option<Run>> {
        let row = sqlx::query("SELECT id, timestamp, files FROM runs WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_run(&row)?)),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Module Operations
    // ========================================================================

    /// Insert a module row for a newly discovered path.
    ///
    /// Check-then-insert contract: callers must have verified via
    /// [`CoderevDb::get_module_by_path`] that the path is untracked. A
    /// duplicate path surfaces as [`DbError::Constraint`] (the storage-level
    /// UNIQUE constraint backs the check), which indicates a logic bug or a
    /// violated single-writer precondition.
    pub async fn insert_module(
        &self,
        path: &str,
        first_reviewed: i64,
        last_reviewed: i64,
        first_snapshot: Option<i64>,
        last_snapshot: Option<i64>,
    ) -> Result<Module> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO modules (path, first_reviewed, last_reviewed, first_snapshot, last_snapshot)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(path)
        .bind(first_reviewed)
        .bind(last_reviewed)
        .bind(first_snapshot)
        .bind(last_snapshot)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::from_insert(e, format!("module path already tracked: {path}")))?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(
            "SELECT id, path, first_reviewed, last_reviewed, first_snapshot, last_snapshot \
             FROM modules WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row_to_module(&row))
    }

    /// Get a module by id.
    pub async fn get_module(&self, id: i64) -> Result<Option<Module>> {
        let row = sqlx::query(
            "SELECT id, path, first_reviewed, last_reviewed, first_snapshot, last_snapshot \
             FROM modules WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|row| row_to_module(&row)))
    }

    /// Get a module by its path (the unique key).
    pub async fn get_module_by_path(&self, path: &str) -> Result<Option<Module>> {
        let row = sqlx::query(
            "SELECT id, path, first_reviewed, last_reviewed, first_snapshot, last_snapshot \
             FROM modules WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|row| row_to_module(&row)))
    }

    // ========================================================================
    // Snapshot Operations
    // ========================================================================

    /// Record a reviewed content version and update the owning module's
    /// denormalized pointers, all in one transaction.
    ///
    /// Maintains on the module: `last_reviewed` and `last_snapshot` always,
    /// `first_snapshot` only if it was unset. Centralizing this here keeps
    /// the pointers from drifting across callers.
    ///
    /// Check-then-insert contract: callers must have verified via
    /// [`CoderevDb::get_snapshot_by_fingerprint`] that the fingerprint is
    /// unseen. A duplicate fingerprint means the dedup gate was bypassed and
    /// surfaces as [`DbError::Constraint`].
    pub async fn insert_snapshot(
        &self,
        fingerprint: &str,
        timestamp: i64,
        summary: &str,
        module_id: i64,
    ) -> Result<Snapshot> {
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            "INSERT INTO snapshots (fingerprint, timestamp, summary, module_id) VALUES (?, ?, ?, ?)",
        )
        .bind(fingerprint)
        .bind(timestamp)
        .bind(summary)
        .bind(module_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => DbError::Constraint(
                format!("snapshot fingerprint already recorded: {fingerprint}"),
            ),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => DbError::NotFound(
                format!("module {module_id} referenced by snapshot {fingerprint}"),
            ),
            _ => DbError::Sqlx(e),
        })?;

        let snapshot_id = result.last_insert_rowid();

        let updated = sqlx::query(
            r#"
            UPDATE modules SET
                last_reviewed = ?,
                last_snapshot = ?,
                first_snapshot = COALESCE(first_snapshot, ?)
            WHERE id = ?
            "#,
        )
        .bind(timestamp)
        .bind(snapshot_id)
        .bind(snapshot_id)
        .bind(module_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Transaction rolls back on drop; no orphan snapshot remains.
            return Err(DbError::not_found(format!(
                "module {module_id} referenced by snapshot {fingerprint}"
            )));
        }

        let row = sqlx::query(
            "SELECT id, fingerprint, timestamp, summary, module_id FROM snapshots WHERE id = ?",
        )
        .bind(snapshot_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row_to_snapshot(&row))
    }

    /// Point a module at an existing snapshot.
    ///
    /// Used when a module's content is byte-identical to a snapshot already
    /// owned by another module: the content was reviewed in this run, so the
    /// module's pointers and `last_reviewed` advance, but no second snapshot
    /// exists for those bytes.
    pub async fn link_module_snapshot(
        &self,
        module_id: i64,
        snapshot_id: i64,
        timestamp: i64,
    ) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE modules SET
                last_reviewed = ?,
                last_snapshot = ?,
                first_snapshot = COALESCE(first_snapshot, ?)
            WHERE id = ?
            "#,
        )
        .bind(timestamp)
        .bind(snapshot_id)
        .bind(snapshot_id)
        .bind(module_id)
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::not_found(format!("module {module_id}")));
        }

        Ok(())
    }

    /// Get a snapshot by id.
    pub async fn get_snapshot(&self, id: i64) -> Result<Option<Snapshot>> {
        let row = sqlx::query(
            "SELECT id, fingerprint, timestamp, summary, module_id FROM snapshots WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|row| row_to_snapshot(&row)))
    }

    /// Get a snapshot by content fingerprint (the global dedup key).
    pub async fn get_snapshot_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Snapshot>> {
        let row = sqlx::query(
            "SELECT id, fingerprint, timestamp, summary, module_id FROM snapshots WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|row| row_to_snapshot(&row)))
    }

    // ========================================================================
    // Message / Review Log Operations
    // ========================================================================

    /// Append a message log entry.
    pub async fn insert_message(&self, timestamp: i64, content: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO messages (timestamp, content) VALUES (?, ?)")
            .bind(timestamp)
            .bind(content)
            .execute(self.pool())
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a message by id.
    pub async fn get_message(&self, id: i64) -> Result<Option<LogEntry>> {
        let row = sqlx::query("SELECT id, timestamp, content FROM messages WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|row| row_to_log_entry(&row)))
    }

    /// Append a review log entry.
    pub async fn insert_review(&self, timestamp: i64, content: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO reviews (timestamp, content) VALUES (?, ?)")
            .bind(timestamp)
            .bind(content)
            .execute(self.pool())
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a review by id.
    pub async fn get_review(&self, id: i64) -> Result<Option<LogEntry>> {
        let row = sqlx::query("SELECT id, timestamp, content FROM reviews WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|row| row_to_log_entry(&row)))
    }
}

fn row_to_module(row: &SqliteRow) -> Module {
    Module {
        id: row.get("id"),
        path: row.get("path"),
        first_reviewed: row.get("first_reviewed"),
        last_reviewed: row.get("last_reviewed"),
        first_snapshot: row.get("first_snapshot"),
        last_snapshot: row.get("last_snapshot"),
    }
}

fn row_to_snapshot(row: &SqliteRow) -> Snapshot {
    Snapshot {
        id: row.get("id"),
        fingerprint: row.get("fingerprint"),
        timestamp: row.get("timestamp"),
        summary: row.get("summary"),
        module_id: row.get("module_id"),
    }
}

fn row_to_log_entry(row: &SqliteRow) -> LogEntry {
    LogEntry {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        content: row.get("content"),
    }
}

fn row_to_run(row: &SqliteRow) -> Result<Run> {
    let files_json: String = row.get("files");
    let files: Vec<String> = serde_json::from_str(&files_json)?;

    Ok(Run {
        id: row.get("id"),
        timestamp: row.get("timestamp"),
        files,
    })
}
