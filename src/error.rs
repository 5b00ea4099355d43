//! Error types and Axum response conversions.

use crate::auth::verify::VerifyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Non-standard "Login Time-out" status used for expired sign-in messages.
const LOGIN_TIMEOUT: u16 = 440;

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid nonce")]
    InvalidNonce,

    #[error("Message expired at {0}")]
    ExpiredMessage(DateTime<Utc>),

    #[error("Unauthorized: {0}")]
    Unauthenticated(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::MalformedRequest(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::InvalidSignature(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, format!("Invalid signature: {}", msg))
            }
            AppError::InvalidNonce => {
                (StatusCode::UNPROCESSABLE_ENTITY, "Invalid nonce.".to_string())
            }
            AppError::ExpiredMessage(at) => (
                StatusCode::from_u16(LOGIN_TIMEOUT).unwrap_or(StatusCode::UNPROCESSABLE_ENTITY),
                format!("Message expired at {}.", at.to_rfc3339()),
            ),
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "message": message
        }));

        (status, body).into_response()
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Malformed(e) => {
                AppError::MalformedRequest(format!("Invalid sign-in message: {}", e))
            }
            VerifyError::InvalidSignature(msg) => AppError::InvalidSignature(msg),
            VerifyError::NonceMismatch => AppError::InvalidNonce,
            VerifyError::Expired(at) => AppError::ExpiredMessage(at),
        }
    }
}
