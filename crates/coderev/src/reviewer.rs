//! Reviewer collaborator interface.
//!
//! The pipeline talks to the external review service through the
//! [`Reviewer`] trait: one logical batch in, one outcome per item out,
//! correlated by identifier (response order is not significant). The service
//! is treated as slow, stateless between calls, and allowed to fail per
//! item.

use crate::error::{CoderevError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// One unit of review work: a file's identifier (its path) and content.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem {
    pub identifier: String,
    pub content: String,
}

/// Per-item outcome of a batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Review succeeded; carries the summary text.
    Summary(String),
    /// Review failed for this item only.
    Error(String),
}

/// Outcome correlated back to the item that produced it.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub identifier: String,
    pub outcome: ReviewOutcome,
}

/// A batch review backend.
///
/// An `Err` from `submit_batch` means the whole call failed (network,
/// service down); per-item failures are reported through
/// [`ReviewOutcome::Error`] instead.
#[allow(async_fn_in_trait)]
pub trait Reviewer {
    async fn submit_batch(&self, items: Vec<ReviewItem>) -> Result<Vec<ReviewResult>>;
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    items: &'a [ReviewItem],
}

#[derive(Deserialize)]
struct BatchResponse {
    results: Vec<WireResult>,
}

#[derive(Deserialize)]
struct WireResult {
    identifier: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP-backed reviewer: POSTs the whole batch as JSON to a configured
/// endpoint and reads one outcome per item from the response.
pub struct HttpReviewer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpReviewer {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoderevError::Reviewer(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl Reviewer for HttpReviewer {
    async fn submit_batch(&self, items: Vec<ReviewItem>) -> Result<Vec<ReviewResult>> {
        info!(items = items.len(), endpoint = %self.endpoint, "Submitting review batch");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&BatchRequest { items: &items })
            .send()
            .await
            .map_err(|e| CoderevError::Reviewer(format!("batch submission failed: {e}")))?
            .error_for_status()
            .map_err(|e| CoderevError::Reviewer(format!("reviewer rejected batch: {e}")))?;

        let body: BatchResponse = response
            .json()
            .await
            .map_err(|e| CoderevError::Reviewer(format!("malformed reviewer response: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| ReviewResult {
                outcome: match (r.summary, r.error) {
                    (Some(summary), _) => ReviewOutcome::Summary(summary),
                    (None, Some(error)) => ReviewOutcome::Error(error),
                    (None, None) => {
                        ReviewOutcome::Error("reviewer returned neither summary nor error".into())
                    }
                },
                identifier: r.identifier,
            })
            .collect())
    }
}
