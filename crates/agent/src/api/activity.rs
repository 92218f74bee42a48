use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use super::{constant_time_eq, AppState};
use common::activity_log::ActivityLogStore;
use common::types::ActivityLogEntry;

const FEED_QUERY_CHARS: usize = 150;
const FEED_IP_CHARS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub token: Option<String>,
}

/// Admin view of the activity log: recent entries, per-day stats, and
/// pagination. Guarded by the static admin token (query param or bearer
/// header); with no token configured the endpoint is open, which is the
/// local-dev mode.
pub async fn activity_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
    headers: HeaderMap,
) -> Response {
    if let Some(expected) = &state.admin_token {
        let provided = params.token.clone().or_else(|| bearer_token(&headers));
        let authorized = provided
            .as_deref()
            .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()));
        if !authorized {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"})))
                .into_response();
        }
    }

    let Some(store) = &state.activity else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Activity logging not configured"})),
        )
            .into_response();
    };

    let limit = params.limit.unwrap_or(50).min(200);
    let offset = params.offset.unwrap_or(0);

    let page = fetch_page(store, offset, limit, state.stats_days).await;
    match page {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %e, "activity log retrieval failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to retrieve activity logs"})),
            )
                .into_response()
        }
    }
}

async fn fetch_page(
    store: &ActivityLogStore,
    offset: usize,
    limit: usize,
    stats_days: u32,
) -> anyhow::Result<serde_json::Value> {
    let activities = store.recent(offset, limit).await?;
    let stats = store
        .stats_for_last_days(Utc::now().date_naive(), stats_days)
        .await?;
    let total = store.total().await?;

    Ok(json!({
        "activities": activities,
        "stats": stats,
        "pagination": {
            "total": total,
            "limit": limit,
            "offset": offset,
            "hasMore": (offset + limit) < total as usize,
        }
    }))
}

/// Public live feed for the output panel: recent entries with queries
/// truncated and IPs redacted, plus today's counters. An unconfigured
/// store yields an empty 200, not an error.
pub async fn live_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityParams>,
) -> Response {
    let Some(store) = &state.activity else {
        return Json(json!({
            "activities": [],
            "stats": {},
            "message": "Activity logging not configured"
        }))
        .into_response();
    };

    let limit = params.limit.unwrap_or(20).min(50);
    match fetch_feed(store, limit).await {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            error!(error = %e, "live feed retrieval failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to fetch live feed"})),
            )
                .into_response()
        }
    }
}

async fn fetch_feed(store: &ActivityLogStore, limit: usize) -> anyhow::Result<serde_json::Value> {
    let activities = store.recent(0, limit).await?;
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let today_stats = store.day_stats(&today).await?;
    let total = store.total().await?;

    let last_update = activities
        .first()
        .and_then(|entry| Utc.timestamp_millis_opt(entry.timestamp).single())
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));

    let total_queries = today_stats.get("queries").copied().unwrap_or(0);
    let categories: serde_json::Map<String, serde_json::Value> = today_stats
        .iter()
        .filter_map(|(key, count)| {
            key.strip_prefix("cat:")
                .map(|cat| (cat.to_string(), json!(count)))
        })
        .collect();

    Ok(json!({
        "activities": activities.iter().map(sanitize_entry).collect::<Vec<_>>(),
        "todayStats": {
            "totalQueries": total_queries,
            "categories": categories,
        },
        "totalAllTime": total,
        "lastUpdate": last_update,
    }))
}

/// Redact an entry for public display: truncated query, elided IP.
fn sanitize_entry(entry: &ActivityLogEntry) -> serde_json::Value {
    let time = Utc
        .timestamp_millis_opt(entry.timestamp)
        .single()
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default();

    let user_ip = entry
        .user_ip
        .as_deref()
        .map(|ip| format!("{}...", ip.chars().take(FEED_IP_CHARS).collect::<String>()))
        .unwrap_or_else(|| "unknown".to_string());

    json!({
        "timestamp": entry.timestamp,
        "time": time,
        "category": entry.category,
        "query": entry.query.chars().take(FEED_QUERY_CHARS).collect::<String>(),
        "response": entry.response,
        "functionsUsed": entry.functions_used,
        "userIP": user_ip,
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    Some(
        value
            .strip_prefix("Bearer ")
            .unwrap_or(value)
            .to_string(),
    )
}
