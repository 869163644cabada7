//! Per-call options and their resolution against store defaults.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::document::Document;
use crate::embedding::Embedder;
use crate::store::StoreError;

/// Options accepted by store operations.
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Minimum score in `[0, 1]`; `0` or unset disables filtering.
    pub score_threshold: Option<f32>,
    /// Filter expression passed to the index verbatim.
    pub filter: Option<Value>,
    /// Embedder overriding the store's default for this call.
    pub embedder: Option<Arc<dyn Embedder>>,
}

impl fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("score_threshold", &self.score_threshold)
            .field("filter", &self.filter)
            .field("embedder", &self.embedder.as_ref().map(|_| "<override>"))
            .finish()
    }
}

impl CallOptions {
    /// Empty options: store embedder, no filter, no threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score threshold.
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Set the filter expression.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Override the embedder for this call.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }
}

/// Options after validation and defaulting.
#[derive(Clone)]
pub struct ResolvedOptions {
    /// Embedder to use for this call.
    pub embedder: Arc<dyn Embedder>,
    /// Filter expression, if any.
    pub filter: Option<Value>,
    /// Validated threshold; `0.0` means unfiltered.
    pub score_threshold: f32,
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("embedder", &"<embedder>")
            .field("filter", &self.filter)
            .field("score_threshold", &self.score_threshold)
            .finish()
    }
}

/// Validate `options` and fill gaps from the store's default embedder.
pub fn resolve(
    options: CallOptions,
    default_embedder: Option<&Arc<dyn Embedder>>,
) -> Result<ResolvedOptions, StoreError> {
    let CallOptions {
        score_threshold,
        filter,
        embedder,
    } = options;

    let score_threshold = validate_score_threshold(score_threshold.unwrap_or(0.0))?;
    let embedder = embedder
        .or_else(|| default_embedder.cloned())
        .ok_or(StoreError::MissingEmbedder)?;

    Ok(ResolvedOptions {
        embedder,
        filter,
        score_threshold,
    })
}

/// Reject thresholds outside `[0, 1]`, including NaN.
pub fn validate_score_threshold(threshold: f32) -> Result<f32, StoreError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(StoreError::InvalidScoreThreshold(threshold))
    }
}

/// Keep documents scoring at least `threshold`, preserving order. A threshold of `0` keeps
/// everything.
pub fn apply_score_threshold(documents: Vec<Document>, threshold: f32) -> Vec<Document> {
    if threshold == 0.0 {
        return documents;
    }
    documents
        .into_iter()
        .filter(|document| document.score >= threshold)
        .collect()
}
