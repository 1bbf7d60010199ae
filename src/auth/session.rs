//! Session manager: the only component that mutates the session store.
//!
//! Orchestrates the authentication state machine: challenge consumption,
//! signature verification, session creation, validation, extension on
//! refresh, and revocation.
//!
//! Crypto and storage failures are converted to the error taxonomy here;
//! nothing below this boundary leaks raw errors to the request gate.

use crate::auth::token::TokenCodec;
use crate::auth::verify::verify_wallet_signature;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{normalize_address, AuthTokens, SessionInfo, StoredChallenge, StoredSession};
use crate::store::{now_ms, Lookup, TtlStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct SessionManager {
    challenges: TtlStore<StoredChallenge>,
    sessions: TtlStore<StoredSession>,
    codec: TokenCodec,
    config: Arc<Config>,
}

impl SessionManager {
    pub fn new(
        challenges: TtlStore<StoredChallenge>,
        sessions: TtlStore<StoredSession>,
        codec: TokenCodec,
        config: Arc<Config>,
    ) -> Self {
        Self {
            challenges,
            sessions,
            codec,
            config,
        }
    }

    /// Consume a challenge, verify the wallet signature, and create a
    /// session with a fresh token pair.
    ///
    /// The challenge is removed atomically before anything else, so a
    /// failed attempt still burns it (single use).
    pub fn verify_and_create_session(
        &self,
        wallet_address: &str,
        signature: &str,
        challenge_id: &str,
    ) -> Result<AuthTokens, AppError> {
        let wallet_address = normalize_address(wallet_address);

        // Atomic get-and-delete; absent and expired look the same here
        let challenge = self
            .challenges
            .take(challenge_id)
            .ok_or(AppError::ChallengeInvalid)?;

        if challenge.wallet_address != wallet_address {
            // Collapsed to ChallengeInvalid externally; keep the real
            // cause in the log
            tracing::warn!(
                challenge_id = %challenge_id,
                wallet = %wallet_address,
                "Challenge issued for a different wallet"
            );
            return Err(AppError::ChallengeInvalid);
        }

        if self.config.dev_mode {
            tracing::warn!(
                wallet = %wallet_address,
                "DEV MODE: skipping signature verification"
            );
        } else {
            verify_wallet_signature(&challenge.message, signature, &wallet_address)?;
        }

        let now = now_ms();
        let session = StoredSession {
            session_id: nanoid::nanoid!(21),
            wallet_address: wallet_address.clone(),
            challenge_id: challenge.challenge_id,
            created_at: now,
            expires_at: now + self.config.session_duration_ms(),
            last_activity: now,
        };

        let tokens = self.issue_tokens(&session)?;
        self.sessions.put(session.session_id.clone(), session);

        tracing::info!(action = "auth_success", wallet = %wallet_address, "Wallet authenticated");

        Ok(tokens)
    }

    /// Validate an access token against the live session store.
    ///
    /// The token signature alone is never enough: the session must still
    /// exist and be unexpired. Touches `last_activity` on success.
    pub fn validate(&self, access_token: &str) -> SessionInfo {
        let claims = match self.codec.verify_access(access_token) {
            Ok(claims) => claims,
            Err(_) => return SessionInfo::unauthenticated(),
        };

        // Expired and missing sessions are indistinguishable to the
        // caller; only the log keeps them apart
        let session = match self.sessions.lookup(&claims.sid) {
            Lookup::Live(session) => session,
            Lookup::Expired => {
                tracing::debug!(session_id = %claims.sid, "Session expired");
                return SessionInfo::unauthenticated();
            }
            Lookup::Missing => {
                tracing::debug!(session_id = %claims.sid, "Session not found (revoked?)");
                return SessionInfo::unauthenticated();
            }
        };

        match self
            .sessions
            .update(&session.session_id, |s| s.last_activity = now_ms())
        {
            Some(touched) => SessionInfo::from_session(&touched),
            // Expired between lookup and update; treat as gone
            None => SessionInfo::unauthenticated(),
        }
    }

    /// Exchange a refresh token for a new access token, extending the
    /// session's expiry.
    ///
    /// The same refresh token is returned: refresh tokens are not rotated
    /// in this design (accepted tradeoff; a leaked refresh token stays
    /// valid until its own expiry).
    pub fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AppError> {
        let claims = self.codec.verify_refresh(refresh_token)?;

        let duration = self.config.session_duration_ms();
        let session = self
            .sessions
            .update(&claims.sid, |s| {
                let now = now_ms();
                s.expires_at = now + duration;
                s.last_activity = now;
            })
            .ok_or_else(|| {
                tracing::debug!(session_id = %claims.sid, "Refresh for dead session");
                AppError::InvalidToken
            })?;

        let token = self.codec.sign_access(
            &session.wallet_address,
            &session.session_id,
            &session.challenge_id,
            duration,
        )?;

        tracing::debug!(session_id = %session.session_id, "Session extended via refresh");

        Ok(AuthTokens {
            token,
            refresh_token: refresh_token.to_string(),
            expires_at: session.expires_at,
        })
    }

    /// Delete a single session. Idempotent.
    pub fn revoke(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id);
        if removed {
            tracing::info!(action = "logout", session_id = %session_id, "Session revoked");
        }
        removed
    }

    /// Delete every session for a wallet. Returns the count removed.
    pub fn revoke_all(&self, wallet_address: &str) -> usize {
        let wallet_address = normalize_address(wallet_address);
        let removed = self
            .sessions
            .delete_where(|_, s| s.wallet_address == wallet_address);
        if removed > 0 {
            tracing::info!(
                action = "logout_all",
                wallet = %wallet_address,
                revoked = removed,
                "All wallet sessions revoked"
            );
        }
        removed
    }

    fn issue_tokens(&self, session: &StoredSession) -> Result<AuthTokens, AppError> {
        let token = self.codec.sign_access(
            &session.wallet_address,
            &session.session_id,
            &session.challenge_id,
            self.config.session_duration_ms(),
        )?;
        let refresh_token = self.codec.sign_refresh(
            &session.wallet_address,
            &session.session_id,
            self.config.refresh_token_ttl_ms(),
        )?;
        Ok(AuthTokens {
            token,
            refresh_token,
            expires_at: session.expires_at,
        })
    }
}
