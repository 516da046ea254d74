//! HTTP server for the recommendation pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/recommend` | One-shot recommendation: `{issue, source}` → `{passages, explanation}` |
//! | `POST` | `/recommend/stream` | SSE stream of tagged JSON events: `verses`, `explanation_chunk`, `done`/`error` |
//! | `GET`  | `/health` | Health check (version, reranker status) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "issue must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `service_unavailable` (503), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser frontends can
//! call the API directly.

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::error::RecommendError;
use crate::models::{Recommendation, Source};
use crate::pipeline::Recommender;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    recommender: Arc<Recommender>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and serves until the
/// process is terminated.
pub async fn run_server(config: &Config, recommender: Arc<Recommender>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState { recommender };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/recommend/stream", post(handle_recommend_stream))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RecommendError> for AppError {
    fn from(err: RecommendError) -> Self {
        let status = match &err {
            RecommendError::Validation(_) => StatusCode::BAD_REQUEST,
            RecommendError::NoResults => StatusCode::NOT_FOUND,
            RecommendError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RecommendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    reranker_enabled: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reranker_enabled: state.recommender.reranker_enabled(),
    })
}

// ============ POST /recommend ============

/// Request body for both recommendation endpoints. An unknown `source`
/// value fails deserialization and is rejected as a 400 by the extractor.
#[derive(Deserialize)]
struct RecommendRequest {
    issue: String,
    #[serde(default)]
    source: Source,
}

async fn handle_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<Recommendation>, AppError> {
    let recommendation = state
        .recommender
        .recommend(&request.issue, request.source)
        .await?;
    Ok(Json(recommendation))
}

// ============ POST /recommend/stream ============

/// Opens the streaming pipeline and forwards its events over SSE, one
/// tagged JSON object per event. Errors upstream of retrieval still get a
/// plain JSON error response; once streaming starts, failures arrive as a
/// terminal `error` event instead.
async fn handle_recommend_stream(
    State(state): State<AppState>,
    Json(request): Json<RecommendRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let rx = state
        .recommender
        .recommend_stream(&request.issue, request.source)
        .await?;

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (event, rx))
    })
    .map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| {
            "{\"type\":\"error\",\"message\":\"event serialization failed\"}".to_string()
        });
        Ok(Event::default().data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
