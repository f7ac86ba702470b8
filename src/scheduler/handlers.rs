use axum::{extract::State, Json};

use super::service::SchedulerStatus;
use crate::AppState;

/// GET /scheduler/status
pub async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler_service.status().await)
}
