//! Manual "push once" trigger.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorBody};
use crate::gateway::events::PushMessage;
use crate::gateway::scheduler::SchedulerState;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/push_once", get(push_once))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PushOnceResponse {
    pub result: String,
    pub pushed: PushMessage,
    pub recipients: usize,
    pub delivered: usize,
}

// ---------------------------------------------------------------------------
// GET /push_once
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/push_once",
    tag = "Push",
    responses(
        (status = 200, description = "Message broadcast to every connected session", body = PushOnceResponse),
        (status = 503, description = "Server is shutting down", body = ApiErrorBody),
    ),
)]
pub async fn push_once(State(state): State<AppState>) -> Result<Json<PushOnceResponse>, ApiError> {
    if state.gateway.scheduler_state() == SchedulerState::Stopped {
        return Err(ApiError::service_unavailable("Server is shutting down"));
    }

    let (message, report) = state.gateway.push_manual().await;

    let text = message.message.as_str().unwrap_or_default().to_string();
    Ok(Json(PushOnceResponse {
        result: format!("Manual message '{text}' pushed to all clients!"),
        pushed: message,
        recipients: report.recipients,
        delivered: report.delivered,
    }))
}
