use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub live: LiveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Candidate breadth pulled from the search backend before selection.
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,
    /// Number of passages in the final answer set.
    #[serde(default = "default_final_n")]
    pub final_n: usize,
    /// Character ceiling on the submitted concern text.
    #[serde(default = "default_max_concern_chars")]
    pub max_concern_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: default_candidate_k(),
            final_n: default_final_n(),
            max_concern_chars: default_max_concern_chars(),
        }
    }
}

fn default_candidate_k() -> usize {
    50
}
fn default_final_n() -> usize {
    3
}
fn default_max_concern_chars() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Index host serving the scripture corpus (both testaments).
    pub scripture_host: String,
    /// Index host serving the alternate narrative corpus.
    pub story_host: String,
    /// Scale convention of the backend's relevance scores:
    /// `"cosine"`, `"l2"`, or `"dot"`.
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_metric() -> String {
    "cosine".to_string()
}
fn default_namespace() -> String {
    "__default__".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RerankConfig {
    /// Base URL of the reranking service. Unset disables reranking and the
    /// selector always takes the diversity fallback.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl RerankConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    600
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LiveConfig {
    /// Search endpoint for live social content. Unset disables the
    /// social Source entirely (requests for it get a 503).
    #[serde(default)]
    pub url: Option<String>,
    /// The single origin domain hits are restricted to.
    #[serde(default = "default_live_domain")]
    pub domain: String,
    /// Hits with less body text than this are dropped as placeholders.
    #[serde(default = "default_live_min_chars")]
    pub min_chars: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_live_domain() -> String {
    "reddit.com".to_string()
}
fn default_live_min_chars() -> usize {
    80
}

impl LiveConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate retrieval
    if config.retrieval.final_n == 0 {
        anyhow::bail!("retrieval.final_n must be >= 1");
    }
    if config.retrieval.candidate_k < config.retrieval.final_n {
        anyhow::bail!("retrieval.candidate_k must be >= retrieval.final_n");
    }
    if config.retrieval.max_concern_chars == 0 {
        anyhow::bail!("retrieval.max_concern_chars must be > 0");
    }

    // Validate search
    if config.search.scripture_host.trim().is_empty() {
        anyhow::bail!("search.scripture_host must be set");
    }
    match config.search.metric.as_str() {
        "cosine" | "l2" | "dot" => {}
        other => anyhow::bail!(
            "Unknown search metric: '{}'. Must be cosine, l2, or dot.",
            other
        ),
    }

    // Validate generation
    if config.generation.model.trim().is_empty() {
        anyhow::bail!("generation.model must be set");
    }
    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }
    if config.generation.max_tokens == 0 {
        anyhow::bail!("generation.max_tokens must be > 0");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[server]
bind = "127.0.0.1:8080"

[search]
scripture_host = "solace-abc.svc.example.pinecone.io"
story_host = "stories-abc.svc.example.pinecone.io"

[generation]
model = "deepseek/deepseek-chat-v3.1:free"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let file = write_config(MINIMAL);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.retrieval.candidate_k, 50);
        assert_eq!(config.retrieval.final_n, 3);
        assert_eq!(config.search.metric, "cosine");
        assert!(!config.rerank.is_enabled());
        assert!(!config.live.is_enabled());
        assert!((config.generation.temperature - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_final_n_above_candidate_k() {
        let body = format!("{MINIMAL}\n[retrieval]\ncandidate_k = 2\nfinal_n = 5\n");
        let file = write_config(&body);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_unknown_metric() {
        let body = MINIMAL.replace(
            "story_host = \"stories-abc.svc.example.pinecone.io\"",
            "story_host = \"stories-abc.svc.example.pinecone.io\"\nmetric = \"manhattan\"",
        );
        let file = write_config(&body);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let body = format!("{}\ntemperature = 3.5\n", MINIMAL.trim_end());
        let file = write_config(&body);
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_rerank_enabled_when_url_set() {
        let body = format!("{MINIMAL}\n[rerank]\nurl = \"http://localhost:8081\"\n");
        let file = write_config(&body);
        let config = load_config(file.path()).unwrap();
        assert!(config.rerank.is_enabled());
    }
}
