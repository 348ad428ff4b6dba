//! HTTP gateway for Eventwire.
//!
//! Exposes the search agent over server-sent events. Every event of a
//! response becomes one `data: <json>\n\n` frame; the body ends after the
//! done event.
//!
//! Routes:
//! - `GET /health`
//! - `POST /query` with `{"query": "..."}`
//! - `GET /search?query=...`
//!
//! Built on Axum.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        Json,
        sse::{Event as SseEvent, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use eventwire_agent::{SearchAgent, spawn_response};
use eventwire_config::AppConfig;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<SearchAgent>,
    /// Delivery channel capacity for each response
    pub channel_capacity: usize,
}

impl GatewayState {
    pub fn new(agent: Arc<SearchAgent>, channel_capacity: usize) -> Self {
        Self {
            agent,
            channel_capacity,
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/query", post(query_handler))
        .route("/search", get(search_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
///
/// Builds both providers from `config`, so the model and search API keys
/// must be set.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let providers = eventwire_providers::build_from_config(&config)?;
    let agent = Arc::new(SearchAgent::new(
        config.identity.to_identity(),
        providers.model,
        providers.search,
    ));
    let state = Arc::new(GatewayState::new(agent, config.stream.channel_capacity));
    let app = build_router(state);

    info!(addr = %addr, agent = %config.identity.id, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: String,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: Option<String>,
}

/// `POST /query`: answer a JSON-posted query as an SSE stream.
async fn query_handler(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, ApiError> {
    stream_response(&state, &payload.query)
}

/// `GET /search?query=...`: answer a query-string query as an SSE stream.
async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, ApiError> {
    stream_response(&state, params.query.as_deref().unwrap_or_default())
}

/// Spawn one response and frame each of its events as an SSE `data:` line.
///
/// An event that fails to serialize ends the body with an error.
fn stream_response(
    state: &GatewayState,
    query: &str,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>> + use<>>, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        warn!("Rejected request without a query");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "query must not be empty".into(),
            }),
        ));
    }

    info!(query_len = query.len(), "Streaming response");

    let rx = spawn_response(state.agent.clone(), query, state.channel_capacity);
    let stream = rx
        .into_stream()
        .map(|event| SseEvent::default().json_data(&event));

    Ok(Sse::new(stream))
}
