//! Semantic search backend boundary.
//!
//! The pipeline treats search as a black box: query text in, ordered
//! [`Candidate`]s out, no assumptions about the embedding method. An empty
//! result set is valid and must not be an error here. The concrete client
//! targets Pinecone serverless indexes with integrated embeddings (the
//! indexes are populated with text records, so the query is plain text too),
//! one index host per corpus.
//!
//! Retry strategy mirrors the other HTTP clients in this crate: 429/5xx and
//! network errors retry with exponential backoff; other 4xx fail fast.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::models::Candidate;
use crate::sources::Corpus;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Search a corpus for up to `top_k` candidates, optionally narrowed by
    /// a metadata filter. Returns candidates in backend relevance order.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        corpus: Corpus,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<Candidate>>;
}

/// Pinecone serverless search-with-text client.
pub struct PineconeSearch {
    client: reqwest::Client,
    scripture_host: String,
    story_host: String,
    namespace: String,
    api_key: String,
    max_retries: u32,
}

impl PineconeSearch {
    /// # Errors
    ///
    /// Returns an error if `PINECONE_API_KEY` is not in the environment.
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let api_key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| anyhow::anyhow!("PINECONE_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            scripture_host: config.scripture_host.clone(),
            story_host: config.story_host.clone(),
            namespace: config.namespace.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn host(&self, corpus: Corpus) -> &str {
        match corpus {
            Corpus::Scripture => &self.scripture_host,
            Corpus::Story => &self.story_host,
        }
    }
}

#[async_trait]
impl SearchBackend for PineconeSearch {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        corpus: Corpus,
        filter: Option<&serde_json::Value>,
    ) -> Result<Vec<Candidate>> {
        let url = format!(
            "https://{}/records/namespaces/{}/search",
            self.host(corpus),
            self.namespace
        );

        let mut query_body = serde_json::json!({
            "inputs": { "text": query },
            "top_k": top_k,
        });
        if let Some(filter) = filter {
            query_body["filter"] = filter.clone();
        }
        let body = serde_json::json!({ "query": query_body });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .header("Content-Type", "application/json")
                .header("X-Pinecone-API-Version", "2025-01")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return Ok(parse_search_response(&json));
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Search API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Search API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Search failed after retries")))
    }
}

/// Adapter from the backend's hit shape to the normalized [`Candidate`].
///
/// Field names differ between the corpora's embed pipelines (`reference` vs
/// `ref`, `book` vs `book_name` vs `subreddit`), so every variant is probed
/// here and nowhere else. Hits without body text are dropped.
fn parse_search_response(json: &serde_json::Value) -> Vec<Candidate> {
    let hits = json
        .pointer("/result/hits")
        .and_then(|h| h.as_array())
        .map(|h| h.as_slice())
        .unwrap_or(&[]);

    hits.iter().filter_map(candidate_from_hit).collect()
}

fn candidate_from_hit(hit: &serde_json::Value) -> Option<Candidate> {
    let id = hit.get("_id").and_then(|v| v.as_str())?.to_string();
    let score = hit.get("_score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
    let fields = hit.get("fields")?;

    let text = field_str(fields, &["text", "body"])?;
    if text.trim().is_empty() {
        return None;
    }

    let reference =
        field_str(fields, &["reference", "ref"]).unwrap_or_else(|| "Unknown".to_string());
    let group = field_str(fields, &["book", "book_name", "subreddit"])
        .unwrap_or_else(|| reference.clone());
    let link = field_str(fields, &["url", "link"]);

    Some(Candidate {
        id,
        text,
        reference,
        group,
        score,
        link,
    })
}

fn field_str(fields: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| fields.get(k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hits_in_backend_order() {
        let json = serde_json::json!({
            "result": {
                "hits": [
                    {
                        "_id": "PSA_23_1",
                        "_score": 0.91,
                        "fields": {
                            "text": "The LORD is my shepherd; I shall lack nothing.",
                            "reference": "Psalms 23:1-3",
                            "book": "Psalms",
                            "testament": "OT"
                        }
                    },
                    {
                        "_id": "ISA_41_10",
                        "_score": 0.88,
                        "fields": {
                            "text": "Don't be afraid, for I am with you.",
                            "reference": "Isaiah 41:10-12",
                            "book": "Isaiah",
                            "testament": "OT"
                        }
                    }
                ]
            }
        });

        let candidates = parse_search_response(&json);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "PSA_23_1");
        assert_eq!(candidates[0].group, "Psalms");
        assert!((candidates[0].score - 0.91).abs() < 1e-6);
        assert_eq!(candidates[1].reference, "Isaiah 41:10-12");
    }

    #[test]
    fn test_parse_alternate_field_shapes() {
        // Story corpus tags book_name instead of book, ref instead of reference.
        let json = serde_json::json!({
            "result": {
                "hits": [{
                    "_id": "HP_36_2",
                    "_score": 0.75,
                    "fields": {
                        "text": "It matters not what someone is born, but what they grow to be.",
                        "ref": "Goblet of Fire, Chapter 36",
                        "book_name": "Goblet of Fire"
                    }
                }]
            }
        });

        let candidates = parse_search_response(&json);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].reference, "Goblet of Fire, Chapter 36");
        assert_eq!(candidates[0].group, "Goblet of Fire");
    }

    #[test]
    fn test_empty_and_malformed_responses_yield_no_candidates() {
        assert!(parse_search_response(&serde_json::json!({ "result": { "hits": [] } })).is_empty());
        assert!(parse_search_response(&serde_json::json!({})).is_empty());
    }

    #[test]
    fn test_hits_without_text_are_dropped() {
        let json = serde_json::json!({
            "result": {
                "hits": [{ "_id": "x", "_score": 0.5, "fields": { "reference": "Psalms 1:1" } }]
            }
        });
        assert!(parse_search_response(&json).is_empty());
    }
}
