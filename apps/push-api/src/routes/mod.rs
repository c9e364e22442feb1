pub mod health;
pub mod push;

use axum::Router;
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(push::router())
        .merge(crate::gateway::server::router())
        .fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::index,
        health::health,
        // Push
        push::push_once,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            // Gateway types
            crate::gateway::events::PushMessage,
            crate::gateway::events::Source,
            crate::gateway::scheduler::SchedulerState,
            // Route request/response types
            health::HealthResponse,
            push::PushOnceResponse,
        )
    ),
    tags(
        (name = "Health", description = "Liveness and status"),
        (name = "Push", description = "Manual broadcast triggers"),
    ),
)]
pub struct ApiDoc;
