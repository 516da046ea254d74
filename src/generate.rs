//! Generation service boundary: OpenRouter chat completions.
//!
//! Two call shapes: a synchronous completion for the one-shot pipeline and
//! an SSE token stream for the streaming pipeline. Failures are classified
//! into [`GenerationError`] so the orchestrator can distinguish a
//! content-moderation false positive (retryable with a simplified prompt)
//! from everything else (absorbed via the deterministic fallback).

use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// A token stream from the generation backend. The channel closes on normal
/// completion; an `Err` item is terminal.
pub type ChunkReceiver = mpsc::Receiver<Result<String, GenerationError>>;

#[async_trait]
pub trait Generator: Send + Sync {
    /// One-shot completion; returns the full generated text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;

    /// Open an incremental completion and return a channel of text deltas.
    async fn stream(&self, system: &str, user: &str) -> Result<ChunkReceiver, GenerationError>;
}

/// Client for the OpenRouter chat-completions API.
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    api_key: String,
}

impl OpenRouterGenerator {
    /// # Errors
    ///
    /// Returns an error if `OPENROUTER_API_KEY` is not in the environment.
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENROUTER_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    fn request(&self, system: &str, user: &str, stream: bool) -> reqwest::RequestBuilder {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        });

        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", "https://solace.app")
            .header("X-Title", "Solace")
            .json(&body)
    }
}

#[async_trait]
impl Generator for OpenRouterGenerator {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let response = self
            .request(system, user, false)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body_text));
        }

        let json: serde_json::Value = serde_json::from_str(&body_text)
            .map_err(|e| GenerationError::Backend(format!("invalid response JSON: {e}")))?;

        // OpenRouter can report errors inside a 200 body.
        if let Some(error) = json.get("error") {
            return Err(classify_failure(status.as_u16(), &error.to_string()));
        }

        let choice = &json["choices"][0];
        if choice["finish_reason"].as_str() == Some("content_filter") {
            return Err(GenerationError::Moderation);
        }

        choice["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GenerationError::Backend("empty completion".to_string()))
    }

    async fn stream(&self, system: &str, user: &str) -> Result<ChunkReceiver, GenerationError> {
        let response = self
            .request(system, user, true)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body_text));
        }

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buf = String::new();

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(GenerationError::Backend(e.to_string()))).await;
                        return;
                    }
                };

                buf.push_str(&String::from_utf8_lossy(&bytes));

                // SSE lines can be split across network chunks; only
                // complete lines are parsed.
                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    match parse_sse_line(line.trim()) {
                        Delta::Content(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                // Caller disconnected; abandon generation.
                                debug!("stream consumer dropped, aborting generation");
                                return;
                            }
                        }
                        Delta::ContentFilter => {
                            let _ = tx.send(Err(GenerationError::Moderation)).await;
                            return;
                        }
                        Delta::Done => return,
                        Delta::Ignore => {}
                    }
                }
            }
        });

        Ok(rx)
    }
}

enum Delta {
    Content(String),
    ContentFilter,
    Done,
    Ignore,
}

/// Parse one SSE line from a chat-completions stream.
fn parse_sse_line(line: &str) -> Delta {
    let Some(payload) = line.strip_prefix("data: ") else {
        return Delta::Ignore;
    };
    if payload == "[DONE]" {
        return Delta::Done;
    }

    let Ok(json) = serde_json::from_str::<serde_json::Value>(payload) else {
        return Delta::Ignore;
    };

    let choice = &json["choices"][0];
    if choice["finish_reason"].as_str() == Some("content_filter") {
        return Delta::ContentFilter;
    }
    match choice["delta"]["content"].as_str() {
        Some(text) if !text.is_empty() => Delta::Content(text.to_string()),
        _ => Delta::Ignore,
    }
}

/// Classify a generation failure from the backend status and body.
///
/// Moderation rejections come back as a 403 with a flagged-input reason;
/// everything else is an ordinary backend failure.
fn classify_failure(status: u16, body: &str) -> GenerationError {
    let lowered = body.to_lowercase();
    let moderation_hint = lowered.contains("moderation")
        || lowered.contains("flagged")
        || lowered.contains("content_filter");

    if status == 403 && moderation_hint {
        GenerationError::Moderation
    } else {
        GenerationError::Backend(format!("API error {status}: {body}"))
    }
}
