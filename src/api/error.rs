use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;

use crate::clients::errors::Error;

/// Handler error, rendered as `{"detail": "..."}`
pub struct AppError(pub Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!("Request failed ({status}): {}", self.0);

        let body = Json(serde_json::json!({
            "detail": self.0.to_string()
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
