//! Retrieval client
//!
//! Validates the request, bounds the provider call with a deadline and turns
//! the raw provider results into a clean, relevance-ordered passage list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::RetrievalProvider;
use crate::types::Passage;

/// Retrieval client over a [`RetrievalProvider`]
#[derive(Clone)]
pub struct RetrievalClient {
    provider: Arc<dyn RetrievalProvider>,
    config: RetrievalConfig,
}

impl RetrievalClient {
    /// Create a new retrieval client
    pub fn new(provider: Arc<dyn RetrievalProvider>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &Arc<dyn RetrievalProvider> {
        &self.provider
    }

    /// The caller's `top_k`, or the configured default
    pub fn resolve_top_k(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.default_top_k)
    }

    /// Reject queries the retrieval service should never see
    pub fn validate(&self, query: &str, top_k: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::invalid_query("query is empty"));
        }
        if top_k == 0 || top_k > self.config.max_top_k {
            return Err(Error::invalid_query(format!(
                "top_k must be between 1 and {}, got {}",
                self.config.max_top_k, top_k
            )));
        }
        Ok(())
    }

    /// Retrieve at most `top_k` passages, relevance-descending.
    ///
    /// An empty result (nothing above the score thresholds) is `Ok`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        self.validate(query, top_k)?;

        let deadline = Duration::from_millis(self.config.timeout_ms);
        let raw = tokio::time::timeout(deadline, self.provider.retrieve(query, top_k))
            .await
            .map_err(|_| Error::RetrievalTimeout(self.config.timeout_ms))??;

        let received = raw.len();
        let passages = refine(raw, top_k, &self.config);

        tracing::debug!(
            "Retrieved {} passages ({} after filtering)",
            received,
            passages.len()
        );

        Ok(passages)
    }
}

/// Deduplicate, filter by score, order by relevance and cap at `top_k`
fn refine(raw: Vec<Passage>, top_k: usize, config: &RetrievalConfig) -> Vec<Passage> {
    let mut seen = HashSet::new();
    let mut passages: Vec<Passage> = raw
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .filter(|p| !p.score.is_nan() && p.score >= config.min_score)
        .collect();

    Passage::sort_by_relevance(&mut passages);

    // A fraction of a non-positive score would sit above the top score itself
    if let (Some(cutoff), Some(top)) = (config.relative_cutoff, passages.first()) {
        if top.score > 0.0 {
            let threshold = top.score * cutoff;
            passages.retain(|p| p.score > threshold);
        }
    }

    passages.truncate(top_k);
    passages
}
