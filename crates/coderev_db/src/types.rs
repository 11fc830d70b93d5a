//! Entity types for the review ledger.
//!
//! All timestamps are milliseconds since the Unix epoch, matching the
//! INTEGER columns they are stored in.

use serde::{Deserialize, Serialize};

/// A tracked source file, identified by its path.
///
/// Created the first time a path is discovered. The snapshot pointers are
/// denormalized and maintained by [`crate::CoderevDb::insert_snapshot`];
/// nothing else mutates a module row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub path: String,
    pub first_reviewed: i64,
    pub last_reviewed: i64,
    /// First snapshot ever recorded for this module, if any.
    pub first_snapshot: Option<i64>,
    /// Most recent snapshot recorded for this module, if any.
    pub last_snapshot: Option<i64>,
}

/// Audit record of one pipeline invocation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: i64,
    pub timestamp: i64,
    /// File paths considered by the run, in discovery order.
    pub files: Vec<String>,
}

/// Immutable record of one reviewed content version.
///
/// The fingerprint is globally unique in the store: byte-identical content
/// under any path maps to the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: i64,
    pub fingerprint: String,
    pub timestamp: i64,
    pub summary: String,
    pub module_id: i64,
}

/// Append-only log entry (messages and reviews share this shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: i64,
    pub content: String,
}
