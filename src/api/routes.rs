use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::stream::stream_handler;
use crate::cache::http::CachedHttpClient;
use crate::config::Config;

/// Per-process state handed to every handler. Everything in here is built
/// once at startup; requests share it, never reopen it.
#[derive(Clone)]
pub struct ApiState {
    pub http: CachedHttpClient,
    pub config: Arc<Config>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stream", get(stream_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "cache": state.config.cache_backend(),
    }))
}
