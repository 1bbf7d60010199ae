//! Access and refresh token codec.
//!
//! Two JWT (HS256) token types, signed with independent secrets:
//! a short-lived access token presented on each request, and a
//! longer-lived refresh token used solely to obtain new access tokens.
//! Both are bound to a session id; the session store remains the source
//! of truth, so a cryptographically valid token is still useless once
//! its session is gone.
//!
//! Every verification failure (bad signature, malformed structure,
//! expired, wrong token type) collapses to [`AppError::InvalidToken`];
//! the underlying cause is logged at debug level only.

use crate::error::AppError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Type tag carried by every refresh token.
const REFRESH_TYPE: &str = "refresh";

/// Claims embedded in an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Wallet address (lowercase).
    pub sub: String,
    /// Owning session id.
    pub sid: String,
    /// Originating challenge id.
    pub cid: String,
    /// Issued at (Unix timestamp, seconds).
    pub iat: usize,
    /// Expiry (Unix timestamp, seconds).
    pub exp: usize,
}

/// Claims embedded in a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Wallet address (lowercase).
    pub sub: String,
    /// Owning session id.
    pub sid: String,
    /// Always `"refresh"`; an access token can never pass as one.
    pub typ: String,
    pub iat: usize,
    pub exp: usize,
}

/// Signs and verifies the two token types.
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    /// Issue an access token bound to a session.
    pub fn sign_access(
        &self,
        wallet_address: &str,
        session_id: &str,
        challenge_id: &str,
        ttl_ms: u64,
    ) -> Result<String, AppError> {
        let iat = now_secs();
        let claims = AccessClaims {
            sub: wallet_address.to_string(),
            sid: session_id.to_string(),
            cid: challenge_id.to_string(),
            iat,
            exp: iat + (ttl_ms / 1_000) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.access_encoding,
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    /// Issue a refresh token bound to a session.
    pub fn sign_refresh(
        &self,
        wallet_address: &str,
        session_id: &str,
        ttl_ms: u64,
    ) -> Result<String, AppError> {
        let iat = now_secs();
        let claims = RefreshClaims {
            sub: wallet_address.to_string(),
            sid: session_id.to_string(),
            typ: REFRESH_TYPE.to_string(),
            iat,
            exp: iat + (ttl_ms / 1_000) as usize,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.refresh_encoding,
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    /// Verify an access token's signature and expiry.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AppError> {
        decode::<AccessClaims>(token, &self.access_decoding, &validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Access token rejected");
                AppError::InvalidToken
            })
    }

    /// Verify a refresh token's signature, expiry, and type tag.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AppError> {
        let claims = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Refresh token rejected");
                AppError::InvalidToken
            })?;

        if claims.typ != REFRESH_TYPE {
            tracing::debug!(typ = %claims.typ, "Refresh token type mismatch");
            return Err(AppError::InvalidToken);
        }

        Ok(claims)
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn now_secs() -> usize {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}
