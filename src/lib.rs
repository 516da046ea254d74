//! # Solace
//!
//! A retrieval-to-generation pipeline that answers a free-text emotional or
//! spiritual concern with a small set of supporting passages from a chosen
//! corpus plus a generated empathetic explanation grounded only in those
//! passages.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌─────────────┐   ┌────────┐   ┌─────────┐   ┌──────────┐
//! │ Crisis │──▶│   Search    │──▶│ Select │──▶│ Prompt  │──▶│ Generate │
//! │  Gate  │   │ (per-source │   │ rerank │   │ closed- │   │ one-shot │
//! │        │   │   filter)   │   │ or div.│   │  world  │   │ / stream │
//! └───┬────┘   └─────────────┘   └────────┘   └─────────┘   └────┬─────┘
//!     │ short-circuit                                            │
//!     ▼                                                          ▼
//!  fixed resource message                              sanitized response
//! ```
//!
//! The crisis gate runs before any external call. Rerank failures fall back
//! to diversity selection; generation failures fall back to a deterministic
//! citation list — once relevant passages are found, the caller always
//! receives them.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`crisis`] | Self-harm short-circuit |
//! | [`sources`] | Static per-Source table (persona, corpus route, filter) |
//! | [`search`] | Semantic search backend boundary |
//! | [`live`] | Live social-content search backend |
//! | [`rerank`] | Optional reranking service |
//! | [`select`] | Passage selection with diversity fallback |
//! | [`prompt`] | Closed-world prompt builder |
//! | [`sanitize`] | Output cleaning (batch + streaming) |
//! | [`generate`] | Generation service client |
//! | [`pipeline`] | Recommendation orchestrator |
//! | [`error`] | Error taxonomy |
//! | [`server`] | HTTP server |

pub mod config;
pub mod crisis;
pub mod error;
pub mod generate;
pub mod live;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod rerank;
pub mod sanitize;
pub mod search;
pub mod select;
pub mod server;
pub mod sources;
