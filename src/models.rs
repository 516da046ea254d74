//! Core data models used throughout Solace.
//!
//! These types represent the concerns, retrieved candidates, and selected
//! passages that flow through the recommendation pipeline, plus the tagged
//! events emitted by the streaming variant.

use serde::{Deserialize, Serialize};

/// Which text corpus (and persona) a request draws from.
///
/// Unknown values fail deserialization, so a request with a typo'd source
/// is rejected as a 400 rather than silently widening to the full corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Full Bible corpus, both testaments.
    #[default]
    Bible,
    /// Bible corpus restricted to the Old Testament.
    OldTestament,
    /// The alternate narrative corpus (separate index).
    HarryPotter,
    /// Live social content, fetched at request time.
    Reddit,
}

/// A retrieved text unit from a search backend, pre-selection.
///
/// Produced by the adapter at each backend boundary; the rest of the
/// pipeline never inspects raw backend shapes. Immutable once returned.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Opaque backend identifier, used for dedup during selection.
    pub id: String,
    /// Passage body text.
    pub text: String,
    /// Human-readable citation label (e.g. `"Psalms 23:1-3"`).
    pub reference: String,
    /// Grouping key used by the diversity fallback (book, subreddit).
    pub group: String,
    /// Backend-native relevance score. Scale depends on the backend and is
    /// only meaningful relative to other candidates from the same call.
    pub score: f32,
    /// Optional external link to the passage in context.
    pub link: Option<String>,
}

/// A candidate promoted into the final, citable answer set.
///
/// The score is renormalized into `[0, 1]` — reranker and raw-search score
/// scales differ, so the raw value is never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct SelectedPassage {
    #[serde(rename = "ref")]
    pub reference: String,
    pub text: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Result of the one-shot pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub passages: Vec<SelectedPassage>,
    pub explanation: String,
}

/// Outcome of the crisis gate, computed once per request.
#[derive(Debug, Clone)]
pub struct CrisisDecision {
    pub triggered: bool,
    pub message: &'static str,
}

/// A tagged event on the streaming endpoint.
///
/// Ordering invariants: `Verses` always precedes the first
/// `ExplanationChunk`; `Done` is the last event on success; `Error`
/// terminates the stream with no further events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Verses { passages: Vec<SelectedPassage> },
    ExplanationChunk { content: String },
    Done,
    Error { message: String },
}
