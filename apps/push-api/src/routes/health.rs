use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::gateway::events::Source;
use crate::gateway::scheduler::SchedulerState;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Registered sessions.
    pub sessions: usize,
    /// Open WebSocket outbound queues; can briefly differ from `sessions`
    /// while a connection is being set up or torn down.
    pub connections: usize,
    pub scheduler: SchedulerState,
    /// Sequence number of the last timer push (0 before the first tick).
    pub timer_seq: u64,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, description = "Server banner", body = String)),
)]
pub async fn index() -> &'static str {
    "Push server is running. Connect a WebSocket to /ws!"
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Server is up", body = HealthResponse)),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.gateway.registry().len(),
        connections: state.transport.connection_count(),
        scheduler: state.gateway.scheduler_state(),
        timer_seq: state.gateway.sequencer().current(Source::Timer),
    })
}
