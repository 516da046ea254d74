//! Recommendation orchestrator.
//!
//! Sequences the stages `Validating → CrisisCheck → Searching → Selecting →
//! Prompting → Generating` for both the one-shot and streaming variants.
//! The crisis check runs before any external call and short-circuits the
//! whole pipeline. Failures downstream of retrieval are absorbed locally —
//! the caller always receives the retrieved passages even when prose
//! generation fails — while failures upstream of retrieval surface as
//! [`RecommendError`]s.
//!
//! All backend handles are read-only from the pipeline's perspective and
//! safe for concurrent requests; nothing survives past a response.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::Config;
use crate::crisis;
use crate::error::RecommendError;
use crate::generate::Generator;
use crate::live::LiveSearchBackend;
use crate::models::{Candidate, Recommendation, Source, StreamEvent};
use crate::prompt;
use crate::rerank::Reranker;
use crate::sanitize;
use crate::search::SearchBackend;
use crate::select;
use crate::sources::{self, CorpusRoute};

/// Process-wide pipeline context: configuration plus handles to the
/// external collaborators, constructed once at startup.
pub struct Recommender {
    config: Arc<Config>,
    search: Arc<dyn SearchBackend>,
    live: Option<Arc<dyn LiveSearchBackend>>,
    reranker: Option<Arc<dyn Reranker>>,
    generator: Arc<dyn Generator>,
}

impl Recommender {
    pub fn new(
        config: Arc<Config>,
        search: Arc<dyn SearchBackend>,
        live: Option<Arc<dyn LiveSearchBackend>>,
        reranker: Option<Arc<dyn Reranker>>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            config,
            search,
            live,
            reranker,
            generator,
        }
    }

    pub fn reranker_enabled(&self) -> bool {
        self.reranker.is_some()
    }

    /// One-shot pipeline: returns the selected passages plus a cleaned
    /// explanation (or the deterministic citation fallback).
    pub async fn recommend(
        &self,
        issue: &str,
        source: Source,
    ) -> Result<Recommendation, RecommendError> {
        let issue = self.validate(issue)?;

        let decision = crisis::evaluate(issue);
        if decision.triggered {
            info!("crisis phrase detected, short-circuiting pipeline");
            return Ok(Recommendation {
                passages: Vec::new(),
                explanation: decision.message.to_string(),
            });
        }

        let passages = self.retrieve_and_select(issue, source).await?;

        let (system, user) = prompt::build(issue, source, &passages);
        let explanation = match self.generator.complete(&system, &user).await {
            Ok(text) => sanitize::clean(&text),
            Err(e) if e.is_moderation() => {
                info!("moderation false positive, retrying once with simplified prompt");
                let (system, user) = prompt::build_simplified(source, &passages);
                match self.generator.complete(&system, &user).await {
                    Ok(text) => sanitize::clean(&text),
                    Err(e) => {
                        warn!(error = %e, "simplified retry failed, using citation fallback");
                        String::new()
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "generation failed, using citation fallback");
                String::new()
            }
        };

        let explanation = if explanation.is_empty() {
            fallback_explanation(source, &passages)
        } else {
            explanation
        };

        Ok(Recommendation {
            passages,
            explanation,
        })
    }

    /// Streaming pipeline. Errors upstream of retrieval are returned here
    /// (before any event is emitted); once the receiver is handed back, the
    /// stream always starts with `Verses` and ends with `Done` or a single
    /// `Error`. Dropping the receiver abandons in-flight generation.
    pub async fn recommend_stream(
        &self,
        issue: &str,
        source: Source,
    ) -> Result<mpsc::Receiver<StreamEvent>, RecommendError> {
        let issue = self.validate(issue)?;
        let (tx, rx) = mpsc::channel(16);

        let decision = crisis::evaluate(issue);
        if decision.triggered {
            info!("crisis phrase detected, short-circuiting stream");
            tokio::spawn(async move {
                if tx.send(StreamEvent::Verses { passages: Vec::new() }).await.is_err() {
                    return;
                }
                let content = decision.message.to_string();
                if tx.send(StreamEvent::ExplanationChunk { content }).await.is_err() {
                    return;
                }
                let _ = tx.send(StreamEvent::Done).await;
            });
            return Ok(rx);
        }

        let passages = self.retrieve_and_select(issue, source).await?;
        let (system, user) = prompt::build(issue, source, &passages);
        let generator = Arc::clone(&self.generator);

        tokio::spawn(async move {
            if tx.send(StreamEvent::Verses { passages }).await.is_err() {
                return;
            }

            // No retry once the passages event is out: the stream ends in
            // Done or a single Error, nothing else.
            let mut chunks = match generator.stream(&system, &user).await {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!(error = %e, "streaming generation failed to open");
                    let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                    return;
                }
            };

            while let Some(item) = chunks.recv().await {
                match item {
                    Ok(text) => {
                        let content = sanitize::clean_chunk(&text);
                        if content.is_empty() {
                            continue;
                        }
                        if tx.send(StreamEvent::ExplanationChunk { content }).await.is_err() {
                            // Caller disconnected; drop the chunk receiver
                            // so the generation task aborts too.
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "streaming generation failed mid-stream");
                        let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                        return;
                    }
                }
            }

            let _ = tx.send(StreamEvent::Done).await;
        });

        Ok(rx)
    }

    fn validate<'a>(&self, issue: &'a str) -> Result<&'a str, RecommendError> {
        let trimmed = issue.trim();
        if trimmed.is_empty() {
            return Err(RecommendError::Validation(
                "issue must not be empty".to_string(),
            ));
        }
        let max = self.config.retrieval.max_concern_chars;
        if trimmed.chars().count() > max {
            return Err(RecommendError::Validation(format!(
                "issue must be at most {max} characters"
            )));
        }
        Ok(trimmed)
    }

    /// Searching + Selecting. Empty search results are a terminal error;
    /// rerank failures are absorbed inside the selector.
    async fn retrieve_and_select(
        &self,
        issue: &str,
        source: Source,
    ) -> Result<Vec<crate::models::SelectedPassage>, RecommendError> {
        let candidates = self.fetch_candidates(issue, source).await?;
        if candidates.is_empty() {
            return Err(RecommendError::NoResults);
        }

        let passages = select::select(
            issue,
            &candidates,
            self.config.retrieval.final_n,
            self.reranker.as_deref(),
            &self.config.search.metric,
        )
        .await;

        Ok(passages)
    }

    async fn fetch_candidates(
        &self,
        issue: &str,
        source: Source,
    ) -> Result<Vec<Candidate>, RecommendError> {
        match sources::route(source) {
            CorpusRoute::Indexed { corpus, filter } => {
                let profile = sources::profile(source);
                let query = format!("{} {}", profile.query_instruction, issue);
                let candidates = self
                    .search
                    .search(
                        &query,
                        self.config.retrieval.candidate_k,
                        corpus,
                        filter.as_ref(),
                    )
                    .await?;
                Ok(candidates)
            }
            CorpusRoute::Live => {
                let live = self
                    .live
                    .as_ref()
                    .ok_or(RecommendError::BackendUnavailable("live search"))?;
                Ok(live.search(issue).await?)
            }
        }
    }
}

/// Deterministic textual fallback when generation fails: the user still
/// receives the citations they can act on.
fn fallback_explanation(source: Source, passages: &[crate::models::SelectedPassage]) -> String {
    let refs = passages
        .iter()
        .map(|p| p.reference.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let noun = sources::profile(source).passage_noun;
    format!(
        "These {noun} ({refs}) offer comfort for what you're experiencing. \
Take time to read and reflect on them\u{2014}they contain timeless wisdom \
for your situation."
    )
}
