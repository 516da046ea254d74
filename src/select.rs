//! Passage selection: reduce a large candidate set to a small, diverse,
//! high-relevance final set.
//!
//! Two paths:
//! - **Rerank path** — when a reranker is available and succeeds, its
//!   ordering is trusted holistically: take the top `n`, squash raw margin
//!   scores through a sigmoid, apply no diversity pass.
//! - **Diversity fallback** — when reranking is unavailable or fails at
//!   runtime, iterate candidates in incoming relevance order accepting only
//!   unused grouping keys, then fill remaining slots from the original
//!   order (groups may repeat, candidates never — dedup is by id).
//!
//! A rerank failure is absorbed here and logged; it never fails the request.

use std::collections::HashSet;
use tracing::warn;

use crate::models::{Candidate, SelectedPassage};
use crate::rerank::Reranker;

/// Squash a raw cross-encoder margin score into `(0, 1)`.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Map a backend-native search score into `[0, 1]` using the backend's
/// scale convention. The result is never compared against reranker scores —
/// each scale is only used within its own selection pass.
pub fn normalize_raw_score(raw: f32, metric: &str) -> f32 {
    match metric {
        // Cosine similarity in [-1, 1].
        "cosine" => ((raw + 1.0) / 2.0).clamp(0.0, 1.0),
        // L2 distance, lower is better.
        "l2" => 1.0 / (1.0 + raw.max(0.0)),
        // Dot product on normalized vectors, or anything already unit-ish.
        _ => raw.clamp(0.0, 1.0),
    }
}

/// Diversity selection over candidates in incoming relevance order.
///
/// First pass accepts a candidate only if its grouping key is unused; the
/// second pass fills remaining slots in original order, skipping candidates
/// already selected (by id).
pub fn diversity_select(candidates: &[Candidate], n: usize) -> Vec<&Candidate> {
    let mut chosen: Vec<&Candidate> = Vec::with_capacity(n);
    let mut used_groups: HashSet<&str> = HashSet::new();
    let mut used_ids: HashSet<&str> = HashSet::new();

    for candidate in candidates {
        if chosen.len() == n {
            break;
        }
        if used_groups.contains(candidate.group.as_str()) {
            continue;
        }
        if used_ids.insert(candidate.id.as_str()) {
            used_groups.insert(candidate.group.as_str());
            chosen.push(candidate);
        }
    }

    if chosen.len() < n {
        for candidate in candidates {
            if chosen.len() == n {
                break;
            }
            if used_ids.insert(candidate.id.as_str()) {
                chosen.push(candidate);
            }
        }
    }

    chosen
}

fn to_passage(candidate: &Candidate, score: f32) -> SelectedPassage {
    SelectedPassage {
        reference: candidate.reference.clone(),
        text: candidate.text.clone(),
        score,
        link: candidate.link.clone(),
    }
}

/// Select up to `n` passages from `candidates`.
///
/// Deterministic for identical inputs and identical reranker behavior.
pub async fn select(
    query: &str,
    candidates: &[Candidate],
    n: usize,
    reranker: Option<&dyn Reranker>,
    metric: &str,
) -> Vec<SelectedPassage> {
    if candidates.is_empty() || n == 0 {
        return Vec::new();
    }

    if let Some(reranker) = reranker {
        match reranker.rerank(query, candidates, n).await {
            Ok(hits) => {
                return hits
                    .into_iter()
                    .filter_map(|hit| {
                        candidates
                            .get(hit.index)
                            .map(|c| to_passage(c, sigmoid(hit.raw_score)))
                    })
                    .take(n)
                    .collect();
            }
            Err(e) => {
                warn!(error = %e, "reranker failed, falling back to diversity selection");
            }
        }
    }

    diversity_select(candidates, n)
        .into_iter()
        .map(|c| to_passage(c, normalize_raw_score(c.score, metric)))
        .collect()
}
