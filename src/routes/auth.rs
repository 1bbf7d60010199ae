//! Auth API endpoints.

use crate::auth::challenge::issue_challenge;
use crate::auth::middleware::{AppState, AuthSession};
use crate::error::AppError;
use crate::models::{
    is_valid_address, ChallengeRequest, ChallengeResponse, LogoutAllResponse, RefreshRequest,
    SessionInfo, VerifyRequest,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};

/// POST /api/auth/challenge — Issue a signing challenge for a wallet
pub async fn request_challenge(
    State(state): State<AppState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !is_valid_address(&req.address) {
        return Err(AppError::BadRequest(
            "Address must be a 0x-prefixed 20-byte hex string".to_string(),
        ));
    }

    let issued = issue_challenge(&state.challenges, &req.address, state.config.challenge_expiry_ms());

    Ok(Json(ChallengeResponse {
        challenge: issued.message,
        challenge_id: issued.challenge_id,
        expires_at: issued.expires_at,
    }))
}

/// POST /api/auth/verify — Verify a signed challenge and create a session
pub async fn verify_challenge(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !is_valid_address(&req.address) {
        return Err(AppError::BadRequest(
            "Address must be a 0x-prefixed 20-byte hex string".to_string(),
        ));
    }

    let tokens = state.session_manager.verify_and_create_session(
        &req.address,
        &req.signature,
        &req.challenge_id,
    )?;

    Ok(Json(tokens))
}

/// POST /api/auth/refresh — Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tokens = state.session_manager.refresh(&req.refresh_token)?;
    Ok(Json(tokens))
}

/// GET /api/auth/session — Current authentication state (never rejects)
pub async fn session_info(
    Extension(info): Extension<SessionInfo>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(info))
}

/// POST /api/auth/logout — Revoke the current session
pub async fn logout(
    AuthSession(info): AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    // Dev-mode query identities have no server-side session to revoke
    if let Some(session_id) = &info.session_id {
        state.session_manager.revoke(session_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/auth/logout-all — Revoke every session for the caller's wallet
pub async fn logout_all(
    AuthSession(info): AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let wallet = info
        .wallet_address
        .as_deref()
        .ok_or_else(|| AppError::Internal("Authenticated session without wallet".to_string()))?;

    let revoked = state.session_manager.revoke_all(wallet);
    Ok(Json(LogoutAllResponse { revoked }))
}
