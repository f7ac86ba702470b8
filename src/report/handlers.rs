use axum::{extract::State, Json};
use chrono::NaiveDate;
use serde::Serialize;

use super::service::ReportError;
use crate::forecast::ForecastResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET / and GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: String,
    pub message: String,
    pub target_date: NaiveDate,
    pub forecast: ForecastResult,
}

/// Build and send the report right away. The daily marker is left alone.
/// POST /report/trigger
pub async fn trigger_report(
    State(state): State<AppState>,
) -> Result<Json<TriggerResponse>, ReportError> {
    tracing::info!("Manual report trigger");

    let outcome = state.report_service.run().await?;
    let city = &state.report_service.settings().city;

    Ok(Json(TriggerResponse {
        status: "success".to_string(),
        message: format!("Forecast report sent for {}", city),
        target_date: outcome.target_date,
        forecast: outcome.forecast,
    }))
}
