//! Request, response, and storage models for the auth API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models live in the in-memory TTL stores; derived models
//! (`SessionInfo`) are computed on demand and never persisted.

use crate::store::{now_ms, HasExpiry};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Request for an authentication challenge.
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    pub address: String,
}

/// Response containing the message to sign.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// The exact message the wallet must sign.
    pub challenge: String,
    pub challenge_id: String,
    /// Epoch milliseconds.
    pub expires_at: u64,
}

/// Request to verify a signed challenge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub address: String,
    /// Hex-encoded 65-byte recoverable signature.
    pub signature: String,
    pub challenge_id: String,
}

/// Request to exchange a refresh token for a new access token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair issued after successful verification or refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub token: String,
    pub refresh_token: String,
    /// Session expiry, epoch milliseconds.
    pub expires_at: u64,
}

/// Response after revoking all sessions for a wallet.
#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub revoked: usize,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Outstanding challenge as held in the challenge store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChallenge {
    pub challenge_id: String,
    /// Always lowercase.
    pub wallet_address: String,
    /// The exact string the wallet must sign.
    pub message: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl HasExpiry for StoredChallenge {
    fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

/// Authenticated session as held in the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub session_id: String,
    /// Always lowercase.
    pub wallet_address: String,
    /// The challenge this session originated from.
    pub challenge_id: String,
    pub created_at: u64,
    pub expires_at: u64,
    pub last_activity: u64,
}

impl HasExpiry for StoredSession {
    fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

// ============================================================================
// Derived Models
// ============================================================================

/// Read-only snapshot of a request's authentication state.
///
/// Computed per validation; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub is_authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<u64>,
}

impl SessionInfo {
    /// The unauthenticated state. Missing and expired sessions both
    /// collapse to this shape for the caller.
    pub fn unauthenticated() -> Self {
        SessionInfo {
            is_authenticated: false,
            wallet_address: None,
            session_id: None,
            expires_at: None,
            is_expired: Some(true),
            time_remaining_ms: None,
        }
    }

    pub fn from_session(session: &StoredSession) -> Self {
        SessionInfo {
            is_authenticated: true,
            wallet_address: Some(session.wallet_address.clone()),
            session_id: Some(session.session_id.clone()),
            expires_at: Some(session.expires_at),
            is_expired: Some(false),
            time_remaining_ms: Some(session.expires_at.saturating_sub(now_ms())),
        }
    }
}

/// Normalize a wallet address for storage and comparison.
///
/// Addresses are case-normalized at every boundary; nothing downstream
/// may compare mixed case.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Shallow shape check for a 0x-prefixed 20-byte hex address.
pub fn is_valid_address(address: &str) -> bool {
    let address = address.trim();
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address_lowercases() {
        assert_eq!(
            normalize_address("0xAbCdEF0123456789abcdef0123456789ABCDEF01"),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
    }

    #[test]
    fn test_normalize_address_trims() {
        assert_eq!(normalize_address("  0xABC  "), "0xabc");
    }

    #[test]
    fn test_is_valid_address() {
        assert!(is_valid_address(
            "0xAbCdEF0123456789abcdef0123456789ABCDEF01"
        ));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address(
            "abcdef0123456789abcdef0123456789abcdef0101"
        ));
        assert!(!is_valid_address(
            "0xZZZdEF0123456789abcdef0123456789ABCDEF01"
        ));
    }

    #[test]
    fn test_session_info_from_session() {
        let session = StoredSession {
            session_id: "s1".to_string(),
            wallet_address: "0xabc".to_string(),
            challenge_id: "c1".to_string(),
            created_at: now_ms(),
            expires_at: now_ms() + 60_000,
            last_activity: now_ms(),
        };
        let info = SessionInfo::from_session(&session);
        assert!(info.is_authenticated);
        assert_eq!(info.wallet_address.as_deref(), Some("0xabc"));
        assert_eq!(info.is_expired, Some(false));
        assert!(info.time_remaining_ms.unwrap() > 0);
    }

    #[test]
    fn test_unauthenticated_shape() {
        let info = SessionInfo::unauthenticated();
        assert!(!info.is_authenticated);
        assert!(info.wallet_address.is_none());
        assert_eq!(info.is_expired, Some(true));
    }

    #[test]
    fn test_session_info_omits_absent_fields() {
        let json = serde_json::to_value(SessionInfo::unauthenticated()).unwrap();
        assert_eq!(json["isAuthenticated"], false);
        assert!(json.get("walletAddress").is_none());
        assert!(json.get("sessionId").is_none());
    }
}
