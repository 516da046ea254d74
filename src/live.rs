//! Live-content search backend for the social Source.
//!
//! Unlike the indexed corpora, social content is fetched at request time
//! from a web-search service and filtered down to a single origin domain.
//! Placeholder and too-short hits are dropped before the results are
//! treated as candidates; the subreddit parsed from each hit's URL becomes
//! the diversity grouping key.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::LiveConfig;
use crate::models::Candidate;

/// Placeholder bodies the origin site substitutes for moderated content.
const PLACEHOLDER_BODIES: &[&str] = &["[removed]", "[deleted]"];

#[async_trait]
pub trait LiveSearchBackend: Send + Sync {
    /// Search live content for the raw query text.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>>;
}

/// Client for a Tavily-style web search API restricted to one domain.
pub struct SocialSearch {
    client: reqwest::Client,
    url: String,
    domain: String,
    min_chars: usize,
    api_key: String,
}

impl SocialSearch {
    /// # Errors
    ///
    /// Returns an error if `live.url` is unset or `TAVILY_API_KEY` is not
    /// in the environment.
    pub fn new(config: &LiveConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| anyhow::anyhow!("live.url required for social search"))?;
        let api_key = std::env::var("TAVILY_API_KEY")
            .map_err(|_| anyhow::anyhow!("TAVILY_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url,
            domain: config.domain.clone(),
            min_chars: config.min_chars,
            api_key,
        })
    }
}

#[async_trait]
impl LiveSearchBackend for SocialSearch {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let body = serde_json::json!({
            "query": query,
            "include_domains": [self.domain],
            "max_results": 20,
        });

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Live search API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        Ok(parse_live_response(&json, &self.domain, self.min_chars))
    }
}

/// Adapter from raw web-search hits to normalized [`Candidate`]s, applying
/// the domain restriction and placeholder/length filters.
fn parse_live_response(json: &serde_json::Value, domain: &str, min_chars: usize) -> Vec<Candidate> {
    let results = json
        .get("results")
        .and_then(|r| r.as_array())
        .map(|r| r.as_slice())
        .unwrap_or(&[]);

    results
        .iter()
        .filter_map(|hit| candidate_from_hit(hit, domain, min_chars))
        .collect()
}

fn candidate_from_hit(
    hit: &serde_json::Value,
    domain: &str,
    min_chars: usize,
) -> Option<Candidate> {
    let url = hit.get("url").and_then(|v| v.as_str())?;
    if !url_in_domain(url, domain) {
        return None;
    }

    let content = hit.get("content").and_then(|v| v.as_str())?.trim();
    let lowered = content.to_lowercase();
    if content.len() < min_chars || PLACEHOLDER_BODIES.iter().any(|p| lowered == *p) {
        return None;
    }

    let title = hit.get("title").and_then(|v| v.as_str()).unwrap_or("(untitled)");
    let score = hit.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;

    let group = subreddit_from_url(url).unwrap_or_else(|| domain.to_string());
    let reference = if group == domain {
        format!("\"{title}\"")
    } else {
        format!("r/{group} \u{2014} \"{title}\"")
    };

    Some(Candidate {
        id: url.to_string(),
        text: content.to_string(),
        reference,
        group,
        score,
        link: Some(url.to_string()),
    })
}

/// True when the URL's host is the domain or a subdomain of it.
fn url_in_domain(url: &str, domain: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split('/').next().unwrap_or("");
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Extract the subreddit segment from a reddit permalink.
fn subreddit_from_url(url: &str) -> Option<String> {
    let mut parts = url.split('/').skip_while(|p| *p != "r");
    parts.next()?; // "r"
    let sub = parts.next()?;
    if sub.is_empty() {
        None
    } else {
        Some(sub.to_string())
    }
}
