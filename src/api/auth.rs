use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;

use crate::api::AppState;

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Documentation is reachable without a key
const PUBLIC_PREFIXES: &[&str] = &["/docs", "/openapi.json"];

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|key| key == &*state.api_key);

    if authorized {
        next.run(request).await
    } else {
        warn!("Rejected {} {}: invalid API key", request.method(), path);
        (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({"detail": "Forbidden: Invalid API Key"})),
        )
            .into_response()
    }
}
