use axum::{
    body::Body,
    extract::Extension,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;

/// Key guarding the manual report trigger
#[derive(Clone)]
pub struct AdminApiKey(pub Option<String>);

/// Require `X-API-Key` on admin routes.
///
/// With no key configured every request passes, which is only meant for local runs.
pub async fn require_api_key(
    Extension(AdminApiKey(expected_key)): Extension<AdminApiKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = expected_key else {
        return next.run(request).await;
    };

    let provided_key = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok());

    match provided_key {
        Some(key) if key == expected => next.run(request).await,
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Invalid API key on admin route");
            unauthorized("Invalid API key", "INVALID_API_KEY")
        }
        None => {
            tracing::warn!(path = %request.uri().path(), "Missing API key on admin route");
            unauthorized(
                "API key required. Provide X-API-Key header.",
                "MISSING_API_KEY",
            )
        }
    }
}

fn unauthorized(message: &str, code: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::with_code(message, code)),
    )
        .into_response()
}
