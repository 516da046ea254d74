//! # Solace CLI (`solace`)
//!
//! ## Usage
//!
//! ```bash
//! solace --config ./config/solace.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `solace serve` | Start the HTTP server (`/recommend`, `/recommend/stream`) |
//! | `solace ask "<concern>"` | Run the one-shot pipeline from the terminal |
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! solace serve --config ./config/solace.toml
//!
//! # Ask against the default corpus
//! solace ask "I'm anxious about work"
//!
//! # Ask against the alternate corpus
//! solace ask "I miss my friends" --source harry_potter
//! ```
//!
//! Secrets are read from the environment: `PINECONE_API_KEY`,
//! `OPENROUTER_API_KEY`, and `TAVILY_API_KEY` (only when `[live]` is
//! configured).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use solace::config::{self, Config};
use solace::generate::OpenRouterGenerator;
use solace::live::{LiveSearchBackend, SocialSearch};
use solace::models::Source;
use solace::pipeline::Recommender;
use solace::rerank::{HttpReranker, Reranker};
use solace::search::PineconeSearch;
use solace::server;

/// Solace — passage recommendations for emotional and spiritual concerns.
#[derive(Parser)]
#[command(
    name = "solace",
    about = "Solace — passage recommendations for emotional and spiritual concerns",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/solace.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Run the one-shot pipeline from the terminal.
    Ask {
        /// The concern text.
        concern: String,
        /// Corpus to draw from: bible, old_testament, harry_potter, reddit.
        #[arg(long, default_value = "bible")]
        source: String,
    },
}

fn parse_source(value: &str) -> Result<Source> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| {
        anyhow::anyhow!(
            "Unknown source: '{}'. Use bible, old_testament, harry_potter, or reddit.",
            value
        )
    })
}

/// Construct the pipeline context from config: required backends fail fast
/// at startup, optional ones (reranker, live search) are skipped when
/// unconfigured.
fn build_recommender(config: Arc<Config>) -> Result<Arc<Recommender>> {
    let search = Arc::new(PineconeSearch::new(&config.search)?);
    let generator = Arc::new(OpenRouterGenerator::new(&config.generation)?);

    let reranker: Option<Arc<dyn Reranker>> = if config.rerank.is_enabled() {
        Some(Arc::new(HttpReranker::new(&config.rerank)?))
    } else {
        None
    };

    let live: Option<Arc<dyn LiveSearchBackend>> = if config.live.is_enabled() {
        Some(Arc::new(SocialSearch::new(&config.live)?))
    } else {
        None
    };

    Ok(Arc::new(Recommender::new(
        config, search, live, reranker, generator,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(config::load_config(&cli.config)?);

    match cli.command {
        Commands::Serve => {
            let recommender = build_recommender(Arc::clone(&config))?;
            server::run_server(&config, recommender).await?;
        }
        Commands::Ask { concern, source } => {
            let source = parse_source(&source)?;
            let recommender = build_recommender(Arc::clone(&config))?;
            let recommendation = recommender.recommend(&concern, source).await?;

            for (i, passage) in recommendation.passages.iter().enumerate() {
                println!("{}. [{:.2}] {}", i + 1, passage.score, passage.reference);
                println!("   \"{}\"", passage.text.replace('\n', " "));
                if let Some(ref link) = passage.link {
                    println!("   {}", link);
                }
                println!();
            }
            println!("{}", recommendation.explanation);
        }
    }

    Ok(())
}
