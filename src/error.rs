//! Error taxonomy for the recommendation pipeline.
//!
//! Failures upstream of retrieval (bad input, missing backend, empty index)
//! are surfaced as explicit errors because there is nothing useful to
//! return. Failures downstream of "we already found relevant passages" —
//! rerank errors, generation errors — are absorbed inside the pipeline so
//! the caller still receives the retrieved material; they never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
    /// Bad input. Surfaced immediately; no external calls are made.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A backend required by the requested Source is not configured.
    #[error("{0} backend is not configured")]
    BackendUnavailable(&'static str),

    /// The search backend returned an empty candidate set.
    #[error("no passages matched the concern")]
    NoResults,

    /// Unexpected failure talking to the search backend.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl RecommendError {
    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RecommendError::Validation(_) => "bad_request",
            RecommendError::BackendUnavailable(_) => "service_unavailable",
            RecommendError::NoResults => "not_found",
            RecommendError::Internal(_) => "internal",
        }
    }
}

/// Failures from the generation backend, classified so the orchestrator can
/// decide between the moderation retry and the deterministic fallback.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The backend refused the prompt as a content-moderation hit. For
    /// comfort-seeking concerns this is almost always a false positive, so
    /// the one-shot pipeline retries once with a simplified prompt.
    #[error("generation request was flagged by moderation")]
    Moderation,

    /// Any other generation failure (network, quota, malformed response).
    #[error("generation backend error: {0}")]
    Backend(String),
}

impl GenerationError {
    pub fn is_moderation(&self) -> bool {
        matches!(self, GenerationError::Moderation)
    }
}
