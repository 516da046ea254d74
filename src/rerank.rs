//! Reranking service boundary.
//!
//! Reranking is entirely optional: when no service is configured the
//! passage selector always takes its diversity fallback, and a runtime
//! rerank failure is absorbed the same way. The concrete client targets a
//! text-embeddings-inference style `POST /rerank` endpoint serving a
//! cross-encoder model.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::RerankConfig;
use crate::models::Candidate;

/// One reranked candidate: its index into the input slice plus the raw
/// cross-encoder margin score. Raw scores are squashed into `[0, 1]` by the
/// selector, not here.
#[derive(Debug, Clone, Copy)]
pub struct RerankHit {
    pub index: usize,
    pub raw_score: f32,
}

/// A relevance reranker over retrieved candidates.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rescore `candidates` against `query` and return up to `top_n` hits
    /// in descending relevance order.
    async fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_n: usize,
    ) -> Result<Vec<RerankHit>>;
}

/// HTTP reranker speaking the text-embeddings-inference `/rerank` contract:
/// request `{query, texts}`, response `[{index, score}]`.
pub struct HttpReranker {
    client: reqwest::Client,
    url: String,
}

impl HttpReranker {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("rerank.url required for HTTP reranker"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_n: usize,
    ) -> Result<Vec<RerankHit>> {
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();

        let body = serde_json::json!({
            "query": query,
            "texts": texts,
        });

        let response = self
            .client
            .post(format!("{}/rerank", self.url.trim_end_matches('/')))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Rerank API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        let mut hits = parse_rerank_response(&json, candidates.len())?;
        hits.truncate(top_n);
        Ok(hits)
    }
}

/// Parse a `/rerank` response into hits, dropping entries whose index does
/// not refer back into the candidate slice.
fn parse_rerank_response(json: &serde_json::Value, len: usize) -> Result<Vec<RerankHit>> {
    let entries = json
        .as_array()
        .or_else(|| json.get("results").and_then(|r| r.as_array()))
        .ok_or_else(|| anyhow::anyhow!("Invalid rerank response: expected an array"))?;

    let mut hits = Vec::with_capacity(entries.len());
    for entry in entries {
        let index = entry
            .get("index")
            .and_then(|i| i.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Invalid rerank response: missing index"))?
            as usize;
        let raw_score = entry
            .get("score")
            .and_then(|s| s.as_f64())
            .ok_or_else(|| anyhow::anyhow!("Invalid rerank response: missing score"))?
            as f32;

        if index < len {
            hits.push(RerankHit { index, raw_score });
        }
    }

    // The service returns descending relevance order; keep it stable.
    Ok(hits)
}
