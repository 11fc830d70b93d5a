//! End-to-end tests for the incremental analysis pipeline.
//!
//! These exercise the whole chain (discovery, change detection, batching,
//! persistence) against a real temp-dir tree and a real SQLite ledger, with
//! the external reviewer replaced by a mock.

use coderev::{Pipeline, ReviewItem, ReviewOutcome, ReviewResult, Reviewer, RunReport};
use coderev_db::CoderevDb;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a test environment with temp directories
struct TestEnv {
    /// Temp directory (cleaned up on drop)
    _temp: TempDir,
    /// Source directory for input files
    source_dir: PathBuf,
    /// Database path
    db_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source_dir = temp.path().join("source");
        let db_path = temp.path().join("ledger.db");

        fs::create_dir_all(&source_dir).expect("Failed to create source dir");

        Self {
            _temp: temp,
            source_dir,
            db_path,
        }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.source_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// The absolute path string the pipeline will have recorded for a file.
    fn tracked_path(&self, name: &str) -> String {
        fs::canonicalize(self.source_dir.join(name))
            .expect("file must exist")
            .to_string_lossy()
            .to_string()
    }

    async fn db(&self) -> CoderevDb {
        CoderevDb::open(&self.db_path).await.unwrap()
    }
}

/// Reviewer double: summarizes every item unless its identifier ends with a
/// configured suffix (per-item failure) or the whole call is set to fail.
#[derive(Clone, Default)]
struct MockReviewer {
    fail_suffixes: Vec<&'static str>,
    fail_call: bool,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Reviewer for MockReviewer {
    async fn submit_batch(&self, items: Vec<ReviewItem>) -> coderev::Result<Vec<ReviewResult>> {
        self.batches
            .lock()
            .unwrap()
            .push(items.iter().map(|i| i.identifier.clone()).collect());

        if self.fail_call {
            return Err(coderev::CoderevError::Reviewer(
                "service unavailable".to_string(),
            ));
        }

        Ok(items
            .into_iter()
            .map(|item| {
                let failed = self
                    .fail_suffixes
                    .iter()
                    .any(|s| item.identifier.ends_with(s));
                ReviewResult {
                    outcome: if failed {
                        ReviewOutcome::Error("simulated reviewer failure".to_string())
                    } else {
                        ReviewOutcome::Summary(format!("{} bytes look fine", item.content.len()))
                    },
                    identifier: item.identifier,
                }
            })
            .collect())
    }
}

async fn run_once(env: &TestEnv, reviewer: MockReviewer) -> RunReport {
    let db = env.db().await;
    let pipeline = Pipeline::new(db, reviewer, "*.py", vec!["__pycache__".to_string()]);
    pipeline.run(&env.source_dir).await.expect("run failed")
}

// ============================================================================
// Idempotence and dedup
// ============================================================================

#[tokio::test]
async fn rerunning_an_unchanged_tree_creates_nothing() {
    let env = TestEnv::new();
    env.write_file("a.py", "print('a')\n");
    env.write_file("pkg/b.py", "print('b')\n");

    let first = run_once(&env, MockReviewer::default()).await;
    assert_eq!(first.discovered, 2);
    assert_eq!(first.reviewed, 2);
    assert_eq!(first.snapshots_created, 2);
    assert!(first.is_clean());

    let db = env.db().await;
    let module_a = db
        .get_module_by_path(&env.tracked_path("a.py"))
        .await
        .unwrap()
        .unwrap();
    let module_b = db
        .get_module_by_path(&env.tracked_path("pkg/b.py"))
        .await
        .unwrap()
        .unwrap();

    let second = run_once(&env, MockReviewer::default()).await;
    assert_eq!(second.discovered, 2);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.snapshots_created, 0);
    assert!(second.failed.is_empty());

    // Module table is byte-for-byte unchanged: skips mutate nothing
    assert_eq!(
        db.get_module(module_a.id).await.unwrap().unwrap(),
        module_a
    );
    assert_eq!(
        db.get_module(module_b.id).await.unwrap().unwrap(),
        module_b
    );
}

#[tokio::test]
async fn identical_content_under_different_paths_yields_one_snapshot() {
    let env = TestEnv::new();
    env.write_file("a.py", "shared body\n");
    env.write_file("deep/nested/b.py", "shared body\n");
    env.write_file("c.py", "different body\n");

    let mock = MockReviewer::default();
    let batches = mock.batches.clone();
    let report = run_once(&env, mock).await;

    // Two unique fingerprints -> review batch of size 2
    assert_eq!(batches.lock().unwrap()[0].len(), 2);
    assert_eq!(report.discovered, 3);
    assert_eq!(report.reviewed, 3);
    assert_eq!(report.snapshots_created, 2);

    // Both observers of the shared content reference the same snapshot
    let db = env.db().await;
    let module_a = db
        .get_module_by_path(&env.tracked_path("a.py"))
        .await
        .unwrap()
        .unwrap();
    let module_b = db
        .get_module_by_path(&env.tracked_path("deep/nested/b.py"))
        .await
        .unwrap()
        .unwrap();
    assert!(module_a.last_snapshot.is_some());
    assert_eq!(module_a.last_snapshot, module_b.last_snapshot);

    let shared = db
        .get_snapshot(module_a.last_snapshot.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shared.module_id, module_a.id);

    // Re-running with no changes: 3 skipped, nothing new
    let rerun = run_once(&env, MockReviewer::default()).await;
    assert_eq!(rerun.discovered, 3);
    assert_eq!(rerun.skipped, 3);
    assert_eq!(rerun.snapshots_created, 0);
}

// ============================================================================
// Change and revert detection
// ============================================================================

#[tokio::test]
async fn changing_content_creates_one_new_snapshot_and_keeps_the_old() {
    let env = TestEnv::new();
    env.write_file("mod.py", "version one\n");
    run_once(&env, MockReviewer::default()).await;

    let db = env.db().await;
    let path = env.tracked_path("mod.py");
    let before = db.get_module_by_path(&path).await.unwrap().unwrap();
    let first_snapshot_id = before.last_snapshot.unwrap();

    env.write_file("mod.py", "version two\n");
    let report = run_once(&env, MockReviewer::default()).await;
    assert_eq!(report.snapshots_created, 1);
    assert_eq!(report.skipped, 0);

    let after = db.get_module_by_path(&path).await.unwrap().unwrap();
    assert_ne!(after.last_snapshot, Some(first_snapshot_id));
    // first_snapshot is sticky across content changes
    assert_eq!(after.first_snapshot, Some(first_snapshot_id));

    // The superseded snapshot remains retrievable
    let old = db.get_snapshot(first_snapshot_id).await.unwrap().unwrap();
    assert_eq!(old.module_id, before.id);
}

#[tokio::test]
async fn reverted_content_is_already_seen_and_mutates_nothing() {
    let env = TestEnv::new();
    env.write_file("mod.py", "version one\n");
    run_once(&env, MockReviewer::default()).await;

    env.write_file("mod.py", "version two\n");
    run_once(&env, MockReviewer::default()).await;

    let db = env.db().await;
    let path = env.tracked_path("mod.py");
    let before_revert = db.get_module_by_path(&path).await.unwrap().unwrap();

    // Back to byte-identical version one: already seen, no review
    env.write_file("mod.py", "version one\n");
    let mock = MockReviewer::default();
    let batches = mock.batches.clone();
    let report = run_once(&env, mock).await;

    assert_eq!(report.skipped, 1);
    assert_eq!(report.snapshots_created, 0);
    assert!(batches.lock().unwrap().is_empty(), "reviewer must not be called");

    // Policy: a skip performs no store mutation, so last_reviewed does not
    // advance on revert
    let after_revert = db.get_module_by_path(&path).await.unwrap().unwrap();
    assert_eq!(after_revert, before_revert);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn one_failed_review_does_not_roll_back_its_siblings() {
    let env = TestEnv::new();
    env.write_file("good.py", "good content\n");
    env.write_file("bad.py", "bad content\n");

    let mock = MockReviewer {
        fail_suffixes: vec!["bad.py"],
        ..Default::default()
    };
    let report = run_once(&env, mock).await;

    assert_eq!(report.reviewed, 1);
    assert_eq!(report.snapshots_created, 1);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].path.ends_with("bad.py"));
    assert_eq!(report.failed[0].reason, "simulated reviewer failure");

    let db = env.db().await;
    let good = db
        .get_module_by_path(&env.tracked_path("good.py"))
        .await
        .unwrap()
        .unwrap();
    let bad = db
        .get_module_by_path(&env.tracked_path("bad.py"))
        .await
        .unwrap()
        .unwrap();
    assert!(good.last_snapshot.is_some(), "success must be persisted");
    assert!(bad.last_snapshot.is_none(), "failure must not be persisted");

    // The failed file stayed unseen and is retried on the next run
    let retry = run_once(&env, MockReviewer::default()).await;
    assert_eq!(retry.skipped, 1);
    assert_eq!(retry.snapshots_created, 1);
    assert!(retry.is_clean());
}

#[tokio::test]
async fn whole_batch_failure_leaves_every_file_unseen() {
    let env = TestEnv::new();
    env.write_file("a.py", "alpha\n");
    env.write_file("b.py", "beta\n");

    let mock = MockReviewer {
        fail_call: true,
        ..Default::default()
    };
    let report = run_once(&env, mock).await;
    assert_eq!(report.snapshots_created, 0);
    assert_eq!(report.failed.len(), 2);

    // Nothing committed for them: both reviewed fresh next run
    let retry = run_once(&env, MockReviewer::default()).await;
    assert_eq!(retry.snapshots_created, 2);
    assert!(retry.is_clean());
}

#[tokio::test]
async fn missing_root_aborts_before_any_store_mutation() {
    let env = TestEnv::new();
    let db = env.db().await;

    let pipeline = Pipeline::new(db.clone(), MockReviewer::default(), "*.py", vec![]);
    let err = pipeline
        .run(Path::new("/no/such/tree"))
        .await
        .expect_err("missing root must not look like an empty tree");
    assert!(matches!(err, coderev::CoderevError::NotFound(_)), "got: {err}");

    // Fail fast: not even a run record was written
    assert!(db.get_run(1).await.unwrap().is_none());
}

// ============================================================================
// Run bookkeeping
// ============================================================================

#[tokio::test]
async fn empty_unseen_set_completes_with_zero_reviews() {
    let env = TestEnv::new();
    env.write_file("notes.txt", "not a candidate\n");

    let mock = MockReviewer::default();
    let batches = mock.batches.clone();
    let report = run_once(&env, mock).await;

    assert_eq!(report.discovered, 0);
    assert_eq!(report.reviewed, 0);
    assert!(report.is_clean());
    assert!(batches.lock().unwrap().is_empty());

    // The run itself is still recorded as an audit entry
    let db = env.db().await;
    let run = db.get_run(report.run_id).await.unwrap().unwrap();
    assert!(run.files.is_empty());
}

#[tokio::test]
async fn run_records_the_considered_file_set() {
    let env = TestEnv::new();
    env.write_file("a.py", "alpha\n");
    env.write_file("__pycache__/skipme.py", "cache artifact\n");

    let report = run_once(&env, MockReviewer::default()).await;

    let db = env.db().await;
    let run = db.get_run(report.run_id).await.unwrap().unwrap();
    assert_eq!(run.files.len(), 1);
    assert!(run.files[0].ends_with("a.py"));
}
