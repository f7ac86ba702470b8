use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};

use crate::middleware::{require_api_key, AdminApiKey};
use crate::report::handlers as report_handlers;
use crate::scheduler::handlers as scheduler_handlers;
use crate::AppState;

/// Build the scheduler API routes
fn scheduler_routes() -> Router<AppState> {
    Router::new().route(
        "/scheduler/status",
        get(scheduler_handlers::scheduler_status),
    )
}

/// Build the report routes (protected by API key auth when a key is configured)
fn report_routes(api_key: Option<String>) -> Router<AppState> {
    Router::new()
        .route("/report/trigger", post(report_handlers::trigger_report))
        .layer(middleware::from_fn(require_api_key))
        .layer(Extension(AdminApiKey(api_key)))
}

/// Build the complete application router
pub fn build_router(state: &AppState) -> Router<AppState> {
    let admin_api_key = state.config.admin_api_key.clone();
    Router::new()
        // Health check at root level
        .route("/", get(report_handlers::health))
        .route("/health", get(report_handlers::health))
        .merge(scheduler_routes())
        .merge(report_routes(admin_api_key))
}
