use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::data::models::{ApiError, AuthError};

fn json_error(status: StatusCode, message: String) -> Response {
    let body = json!({
        "error": message,
        "status": status.as_u16()
    });

    (status, axum::Json(body)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AuthError::EmailTaken => (StatusCode::CONFLICT, self.to_string()),
            AuthError::ValidationError(e) => (StatusCode::BAD_REQUEST, e),
            AuthError::DatabaseError(e) => {
                log::error!("auth storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AuthError::HashingError(e) => {
                log::error!("password hashing failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Hashing error".to_string())
            }
            AuthError::SessionError(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session error: {}", e),
            ),
        };

        json_error(status, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e),
            ApiError::InsufficientFunds { .. } => (StatusCode::PAYMENT_REQUIRED, self.to_string()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Store(e) => {
                log::error!("storage failure: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            ApiError::Session(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session error: {}", e),
            ),
        };

        json_error(status, message)
    }
}
