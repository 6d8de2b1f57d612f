use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;

use super::types::SystemStatus;
use super::{ApiError, ApiResponse, AppState};

/// GET /health - liveness probe, unauthenticated.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /system/status (bearer)
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let store = state.store();
    store.ping().await?;

    let total_users = store.count_users().await?;
    let active_sessions = store.count_active_refresh_tokens().await?;
    let audit_events = store.count_login_events().await?;

    Ok(Json(ApiResponse::success(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        total_users,
        active_sessions,
        audit_events,
    })))
}
