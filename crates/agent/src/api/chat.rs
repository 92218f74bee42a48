use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::AppState;
use crate::llm::ChatMessage;
use crate::prompt::SYSTEM_PROMPT;
use crate::tools::Tool;
use common::types::ActivityLogEntry;

const MAX_LOGGED_QUERY_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

/// The chat endpoint: one user turn through the bounded tool-calling loop.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequestBody>,
) -> Response {
    let Some(message) = body.message.as_deref().filter(|m| !m.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Message is required"})),
        )
            .into_response();
    };

    let Some(llm) = &state.llm else {
        error!("XAI_API_KEY not configured");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "API key not configured"})),
        )
            .into_response();
    };

    metrics::counter!("agent_queries_total").increment(1);

    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
    for entry in &body.history {
        // The model's own system prompt is authoritative; client-supplied
        // system entries are dropped.
        match entry.role.as_str() {
            "user" => messages.push(ChatMessage::user(&entry.content)),
            "assistant" => messages.push(ChatMessage::assistant(&entry.content)),
            _ => {}
        }
    }
    messages.push(ChatMessage::user(message));

    let definitions = Tool::definitions();
    let conversation_length = body.history.len() as u32;
    let mut functions_used: Vec<String> = Vec::new();

    for _ in 0..state.max_tool_iterations {
        let reply = match llm.chat(&messages, &definitions).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "completion request failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": e.to_string()})),
                )
                    .into_response();
            }
        };

        let tool_calls = reply.tool_calls.clone().unwrap_or_default();
        if tool_calls.is_empty() {
            let response_text = reply
                .content
                .clone()
                .unwrap_or_else(|| "No response from agent".to_string());
            log_turn(
                &state,
                &headers,
                message,
                &functions_used,
                conversation_length,
            );
            return Json(json!({"response": response_text})).into_response();
        }

        messages.push(reply);
        for call in &tool_calls {
            functions_used.push(call.function.name.clone());
            let result = state
                .toolbox
                .dispatch(&call.function.name, &call.function.arguments)
                .await;
            messages.push(ChatMessage::tool_result(&call.id, result.to_string()));
        }
    }

    // Iteration budget exhausted with the model still asking for tools.
    log_turn(
        &state,
        &headers,
        message,
        &functions_used,
        conversation_length,
    );
    Json(json!({"response": "Processing completed. Query the agent for results."})).into_response()
}

/// Best-effort activity logging on a detached task. Failures are counted
/// and logged, never surfaced to the user.
fn log_turn(
    state: &AppState,
    headers: &HeaderMap,
    message: &str,
    functions_used: &[String],
    conversation_length: u32,
) {
    let Some(store) = state.activity.clone() else {
        return;
    };

    let entry = ActivityLogEntry {
        timestamp: chrono::Utc::now().timestamp_millis(),
        user_ip: Some(client_ip(headers)),
        user_agent: Some(user_agent(headers)),
        category: insight::category::categorize(message).as_str().to_string(),
        query: truncate_chars(message, MAX_LOGGED_QUERY_CHARS),
        response: None,
        functions_used: functions_used.to_vec(),
        conversation_length,
    };

    tokio::spawn(async move {
        if let Err(e) = store.record(&entry).await {
            metrics::counter!("agent_activity_log_failures_total").increment(1);
            warn!(error = %e, "activity logging failed");
        }
    });
}

fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| headers.get("client-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
