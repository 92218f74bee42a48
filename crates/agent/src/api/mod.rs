pub mod activity;
pub mod chat;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::llm::LlmClient;
use crate::tools::Toolbox;
use common::activity_log::ActivityLogStore;

/// Shared application state available to all handlers.
pub struct AppState {
    pub llm: Option<LlmClient>,
    pub toolbox: Toolbox,
    pub activity: Option<Arc<ActivityLogStore>>,
    pub admin_token: Option<String>,
    pub max_tool_iterations: u32,
    pub stats_days: u32,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat::chat))
        .route("/api/activity", get(activity::activity_log))
        .route("/api/feed", get(activity::live_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Constant-time comparison to prevent timing attacks on the admin token.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: uptime,
    })
}
