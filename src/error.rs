//! Error types and Axum response conversions.
//!
//! Authentication failures deliberately collapse to a small set of
//! externally-visible kinds so a caller cannot distinguish, e.g., a
//! malformed signature from a non-matching one, or a revoked session
//! from one that never existed. Internal logs keep the distinction.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Path clients should hit to restart the handshake after an auth failure.
pub const CHALLENGE_ENDPOINT: &str = "/api/auth/challenge";

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Challenge missing, expired, already consumed, or issued for a
    /// different wallet.
    #[error("Challenge not found, expired, or already used")]
    ChallengeInvalid,

    /// Signature malformed or recovered address does not match the claim.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Token malformed, expired, signature mismatch, or wrong token type.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// No usable credentials on a request that requires them.
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ChallengeInvalid => "CHALLENGE_INVALID",
            AppError::InvalidSignature => "INVALID_SIGNATURE",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Unauthenticated => "AUTH_REQUIRED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client can recover by restarting the handshake.
    fn restartable(&self) -> bool {
        matches!(
            self,
            AppError::ChallengeInvalid
                | AppError::InvalidSignature
                | AppError::InvalidToken
                | AppError::Unauthenticated
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        };

        let message = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        let body = if self.restartable() {
            Json(json!({
                "error": message,
                "code": self.code(),
                "hint": format!("Request a new challenge at POST {}", CHALLENGE_ENDPOINT),
            }))
        } else {
            Json(json!({
                "error": message,
                "code": self.code(),
            }))
        };

        (status, body).into_response()
    }
}
