//! HTTP front door.
//!
//! - `POST /api/v1/agent/query` - run one query through the agent pipeline
//! - `GET  /health`             - readiness of both tool-server channels
//!
//! The trace identifier comes in on `X-Request-ID` (generated here when the
//! caller sends none) and is echoed back on the response; the core only
//! threads it through.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use shopmate_agent::{AgentReply, AgentRuntime};

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub request_id: String,
    pub meta: QueryMeta,
}

#[derive(Debug, Serialize)]
pub struct QueryMeta {
    pub intent: String,
    pub duration_ms: u64,
    pub tool_calls: Vec<ToolCallMeta>,
}

#[derive(Debug, Serialize)]
pub struct ToolCallMeta {
    pub tool: String,
    pub duration_ms: u64,
    pub outcome: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub channels: Vec<ChannelHealth>,
    pub checked_at: String,
}

#[derive(Debug, Serialize)]
pub struct ChannelHealth {
    pub name: &'static str,
    pub status: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/agent/query", post(agent_query))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn agent_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<QueryRequest>,
) -> (StatusCode, [(&'static str, String); 1], Json<QueryResponse>) {
    let incoming = headers.get("x-request-id").and_then(|value| value.to_str().ok());
    let request_id = resolve_request_id(incoming);

    info!(
        event_name = "http.query_received",
        trace_id = %request_id,
        "agent query received"
    );

    let reply = state.runtime.handle_query(&payload.query, &request_id).await;
    let response = query_response(reply, request_id.clone());

    (StatusCode::OK, [("x-request-id", request_id)], Json(response))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (ready, payload) = health_payload(state.runtime.channel_health());
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(payload))
}

fn resolve_request_id(incoming: Option<&str>) -> String {
    match incoming {
        Some(value) if !value.trim().is_empty() => value.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

fn query_response(reply: AgentReply, request_id: String) -> QueryResponse {
    QueryResponse {
        answer: reply.reply,
        request_id,
        meta: QueryMeta {
            intent: reply.intent.to_string(),
            duration_ms: reply.duration.as_millis() as u64,
            tool_calls: reply
                .tool_calls
                .into_iter()
                .map(|record| ToolCallMeta {
                    tool: record.tool.to_string(),
                    duration_ms: record.duration.as_millis() as u64,
                    outcome: record.outcome.to_string(),
                })
                .collect(),
        },
    }
}

fn health_payload(channels: Vec<(&'static str, bool)>) -> (bool, HealthResponse) {
    let ready = channels.iter().all(|(_, healthy)| *healthy);
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        channels: channels
            .into_iter()
            .map(|(name, healthy)| ChannelHealth {
                name,
                status: if healthy { "ready" } else { "degraded" },
            })
            .collect(),
        checked_at: chrono::Utc::now().to_rfc3339(),
    };
    (ready, payload)
}

#[cfg(test)]
mod tests {
    use super::{health_payload, resolve_request_id};

    #[test]
    fn incoming_request_id_is_reused() {
        assert_eq!(resolve_request_id(Some("req-42")), "req-42");
    }

    #[test]
    fn blank_or_absent_request_id_generates_one() {
        let generated = resolve_request_id(None);
        assert!(!generated.is_empty());
        let from_blank = resolve_request_id(Some("   "));
        assert!(!from_blank.trim().is_empty());
        assert_ne!(from_blank, "   ");
    }

    #[test]
    fn health_is_degraded_when_any_channel_is_down() {
        let (ready, payload) = health_payload(vec![("products", true), ("orders", false)]);
        assert!(!ready);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.channels[1].status, "degraded");

        let (ready, payload) = health_payload(vec![("products", true), ("orders", true)]);
        assert!(ready);
        assert_eq!(payload.status, "ready");
    }
}
