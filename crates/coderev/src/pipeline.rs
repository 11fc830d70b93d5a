//! The incremental analysis pipeline.
//!
//! One `run` moves through `Discovering → Classifying → Reviewing →
//! Persisting → Done`. Discovery walks the tree; classification ensures a
//! module row per path and checks each file's fingerprint against the
//! snapshot ledger; only unseen content goes to the reviewer, as one batch;
//! each successful outcome is persisted independently (best effort), so a
//! failed sibling never discards a result.
//!
//! Ordering within one file's lifecycle is fixed: fingerprint check, then
//! review submission, then snapshot insert. That ordering is what keeps the
//! at-most-once-review-per-content-version invariant; across files nothing
//! is ordered.

use crate::discovery;
use crate::error::Result;
use crate::fingerprint;
use crate::reviewer::{ReviewItem, ReviewOutcome, Reviewer};
use coderev_db::CoderevDb;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// A file that could not be reviewed in this run. It remains unseen and
/// will be picked up again by the next run.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// Summary of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: i64,
    /// Candidate files produced by discovery.
    pub discovered: usize,
    /// Files whose content already had a snapshot; nothing was written for
    /// them.
    pub skipped: usize,
    /// Files whose content was successfully reviewed this run (includes
    /// files sharing a fingerprint with another reviewed file).
    pub reviewed: usize,
    /// Distinct content versions persisted (one snapshot each).
    pub snapshots_created: usize,
    pub failed: Vec<FileFailure>,
}

/// Unseen content queued for review: one entry per distinct fingerprint,
/// carrying every (path, module id) that observed it this run. The first
/// observer names the batch item.
struct PendingReview {
    fingerprint: String,
    content: Vec<u8>,
    observers: Vec<(String, i64)>,
}

/// Composes discovery, change detection, review, and persistence over a
/// shared store handle.
pub struct Pipeline<R> {
    db: CoderevDb,
    reviewer: R,
    file_pattern: String,
    excluded_dirs: Vec<String>,
}

impl<R: Reviewer> Pipeline<R> {
    pub fn new(
        db: CoderevDb,
        reviewer: R,
        file_pattern: impl Into<String>,
        excluded_dirs: Vec<String>,
    ) -> Self {
        Self {
            db,
            reviewer,
            file_pattern: file_pattern.into(),
            excluded_dirs,
        }
    }

    /// Execute one analysis run over `root`.
    ///
    /// A missing or unreadable root aborts before any store mutation.
    /// Running twice over an unchanged tree is a no-op on the ledger apart
    /// from the run audit record.
    pub async fn run(&self, root: &Path) -> Result<RunReport> {
        // Discovering
        let entries = discovery::discover(root, &self.file_pattern, &self.excluded_dirs)?;
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => files.push(path.to_string_lossy().to_string()),
                Err(err) => {
                    // Unreadable subtree entries are not candidate files;
                    // log and keep walking.
                    warn!(error = %err, "Skipping unreadable entry during discovery");
                }
            }
        }

        let run_id = self.db.insert_run(CoderevDb::now_millis(), &files).await?;
        info!(run_id, discovered = files.len(), root = %root.display(), "Discovery complete");

        // Classifying
        let mut report = RunReport {
            run_id,
            discovered: files.len(),
            skipped: 0,
            reviewed: 0,
            snapshots_created: 0,
            failed: Vec::new(),
        };
        let mut pending: Vec<PendingReview> = Vec::new();
        let mut pending_index: HashMap<String, usize> = HashMap::new();

        for path in &files {
            let module = self.ensure_module(path).await?;

            let (content, fp) = match fingerprint::read_and_fingerprint(Path::new(path)) {
                Ok(read) => read,
                Err(err) => {
                    warn!(path = %path, error = %err, "Read failed; file stays unseen");
                    report.failed.push(FileFailure {
                        path: path.clone(),
                        reason: format!("read failed: {err}"),
                    });
                    continue;
                }
            };

            // Dedup gate: content history is by fingerprint, not by
            // path+time, so reverted content is "already seen" too.
            if self.db.get_snapshot_by_fingerprint(&fp).await?.is_some() {
                debug!(path = %path, "Content already reviewed; skipping");
                report.skipped += 1;
                continue;
            }

            match pending_index.get(&fp) {
                Some(&i) => pending[i].observers.push((path.clone(), module.id)),
                None => {
                    pending_index.insert(fp.clone(), pending.len());
                    pending.push(PendingReview {
                        fingerprint: fp,
                        content,
                        observers: vec![(path.clone(), module.id)],
                    });
                }
            }
        }

        if pending.is_empty() {
            info!(run_id, skipped = report.skipped, "No unseen content; run complete");
            return Ok(report);
        }

        // Reviewing: one batched call, identified by the first observing path
        info!(run_id, batch = pending.len(), "Reviewing unseen content");
        let items: Vec<ReviewItem> = pending
            .iter()
            .map(|p| ReviewItem {
                identifier: p.observers[0].0.clone(),
                content: String::from_utf8_lossy(&p.content).into_owned(),
            })
            .collect();

        let results = match self.reviewer.submit_batch(items).await {
            Ok(results) => results,
            Err(err) => {
                // Whole-call failure: nothing was persisted, every pending
                // file stays unseen for the next run.
                warn!(run_id, error = %err, "Review batch failed");
                for p in &pending {
                    for (path, _) in &p.observers {
                        report.failed.push(FileFailure {
                            path: path.clone(),
                            reason: format!("review batch failed: {err}"),
                        });
                    }
                }
                return Ok(report);
            }
        };

        // Persisting: best effort, one item at a time
        let mut by_identifier: HashMap<String, PendingReview> = pending
            .into_iter()
            .map(|p| (p.observers[0].0.clone(), p))
            .collect();

        for result in results {
            let Some(item) = by_identifier.remove(&result.identifier) else {
                warn!(identifier = %result.identifier, "Reviewer returned an unknown identifier");
                continue;
            };
            match result.outcome {
                ReviewOutcome::Summary(summary) => {
                    self.persist_reviewed(&item, &summary, &mut report).await?;
                }
                ReviewOutcome::Error(reason) => {
                    warn!(identifier = %result.identifier, %reason, "Review failed for item");
                    for (path, _) in &item.observers {
                        report.failed.push(FileFailure {
                            path: path.clone(),
                            reason: reason.clone(),
                        });
                    }
                }
            }
        }

        // Items the reviewer never answered stay unseen
        for (identifier, item) in by_identifier {
            warn!(%identifier, "Reviewer returned no outcome for item");
            for (path, _) in &item.observers {
                report.failed.push(FileFailure {
                    path: path.clone(),
                    reason: "no outcome returned by reviewer".to_string(),
                });
            }
        }

        info!(
            run_id,
            discovered = report.discovered,
            skipped = report.skipped,
            reviewed = report.reviewed,
            snapshots = report.snapshots_created,
            failed = report.failed.len(),
            "Run complete"
        );
        Ok(report)
    }

    /// Make sure a module row exists for the path, creating one on first
    /// sight. Check-then-insert; the store is single-writer per run.
    async fn ensure_module(&self, path: &str) -> Result<coderev_db::Module> {
        if let Some(module) = self.db.get_module_by_path(path).await? {
            return Ok(module);
        }
        let now = CoderevDb::now_millis();
        debug!(path, "Tracking new module");
        Ok(self.db.insert_module(path, now, now, None, None).await?)
    }

    /// Persist one successful review: snapshot (owned by the first
    /// observer, pointer maintenance inside the store transaction), a
    /// review log entry, and pointer updates for every other observer.
    async fn persist_reviewed(
        &self,
        item: &PendingReview,
        summary: &str,
        report: &mut RunReport,
    ) -> Result<()> {
        let now = CoderevDb::now_millis();
        let owner_module = item.observers[0].1;

        let snapshot = self
            .db
            .insert_snapshot(&item.fingerprint, now, summary, owner_module)
            .await?;
        self.db.insert_review(now, summary).await?;

        for (path, module_id) in &item.observers[1..] {
            debug!(path = %path, fingerprint = %item.fingerprint, "Linking duplicate content");
            self.db
                .link_module_snapshot(*module_id, snapshot.id, now)
                .await?;
        }

        report.snapshots_created += 1;
        report.reviewed += item.observers.len();
        Ok(())
    }
}

impl RunReport {
    /// True when every discovered file was either skipped or reviewed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
