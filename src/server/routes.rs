//! REST control surface for the agent: start/stop/inspect.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::agent::{Agent, StartOutcome, StopOutcome};
use crate::agent::state::RunState;
use crate::pipeline::types::{RecentItem, Stats};

/// Shared state for control routes.
#[derive(Clone)]
pub struct ControlState {
    pub agent: Arc<Agent>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: RunState,
    running: bool,
    stats: Stats,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct RecentResponse {
    emails: Vec<RecentItem>,
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "calendar-agent"
    }))
}

/// GET /status
async fn get_status(State(state): State<ControlState>) -> impl IntoResponse {
    let status = state.agent.status().await;
    let stats = state.agent.stats().await;
    Json(StatusResponse {
        status: status.state,
        running: status.running,
        stats,
    })
}

/// GET /stats
async fn get_stats(State(state): State<ControlState>) -> impl IntoResponse {
    Json(state.agent.stats().await)
}

/// POST /start
///
/// Always 200; a failed start is reported in the message and in `/status`.
async fn start_agent(State(state): State<ControlState>) -> impl IntoResponse {
    let message = match state.agent.start().await {
        StartOutcome::Started => "Agent started".to_string(),
        StartOutcome::AlreadyRunning => "Agent already running".to_string(),
        StartOutcome::Failed(reason) => format!("Agent failed to start: {reason}"),
    };
    info!(message = %message, "Start requested via control surface");
    Json(MessageResponse { message })
}

/// POST /stop
async fn stop_agent(State(state): State<ControlState>) -> impl IntoResponse {
    let message = match state.agent.stop().await {
        StopOutcome::Stopped => "Agent stopped",
        StopOutcome::NotRunning => "Agent is not running",
    };
    info!(message, "Stop requested via control surface");
    Json(MessageResponse {
        message: message.to_string(),
    })
}

/// GET /recent_emails, newest first.
async fn recent_emails(State(state): State<ControlState>) -> impl IntoResponse {
    Json(RecentResponse {
        emails: state.agent.recent_items().await,
    })
}

/// Build the control router. CORS is open so the browser-extension
/// popup can call it from its own origin.
pub fn control_routes(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(get_status))
        .route("/stats", get(get_stats))
        .route("/start", post(start_agent))
        .route("/stop", post(stop_agent))
        .route("/recent_emails", get(recent_emails))
        .layer(CorsLayer::permissive())
        .with_state(ControlState { agent })
}
