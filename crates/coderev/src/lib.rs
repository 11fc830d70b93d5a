//! coderev - incremental source review
//!
//! Walks a source tree, fingerprints file content, and sends each distinct
//! content version to an external review service at most once. Review
//! history (modules, runs, snapshots, review logs) lives in a SQLite ledger
//! provided by the `coderev_db` crate.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌─────────────┐    ┌──────────────┐    ┌────────────┐
//! │ Discovery │───▶│  Change     │───▶│   Review     │───▶│   Ledger   │
//! │ (walkdir) │    │  Detector   │    │ Orchestrator │    │  (SQLite)  │
//! └───────────┘    │ (sha-256 vs │    │ (batch, best │    └────────────┘
//!                  │   ledger)   │    │   effort)    │
//!                  └─────────────┘    └──────────────┘
//! ```
//!
//! The ledger is the only shared mutable resource; everything else is
//! stateless given its inputs.

pub mod config;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod reviewer;

pub use config::Config;
pub use error::{CoderevError, Result};
pub use pipeline::{FileFailure, Pipeline, RunReport};
pub use reviewer::{HttpReviewer, ReviewItem, ReviewOutcome, ReviewResult, Reviewer};
