//! Tiered rate-limit policy tables.
//!
//! Selection is a pure function of authentication state; authenticated
//! callers get roughly 3x the unauthenticated ceilings across every
//! tracked resource. Usage counters are not yet backed by a real store:
//! `used` is reported as zero for every resource until a counter backend
//! lands, so `remaining` always equals the ceiling.

use serde::Serialize;

/// Per-resource daily ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitTable {
    pub opensea: u32,
    pub ai_messages: u32,
    pub summaries: u32,
    pub total_tokens: u32,
}

/// Ceilings for callers without a valid session.
pub const UNAUTHENTICATED_LIMITS: LimitTable = LimitTable {
    opensea: 20,
    ai_messages: 10,
    summaries: 5,
    total_tokens: 20_000,
};

/// Ceilings for callers with a valid session (~3x the anonymous tier).
pub const AUTHENTICATED_LIMITS: LimitTable = LimitTable {
    opensea: 60,
    ai_messages: 30,
    summaries: 15,
    total_tokens: 60_000,
};

/// Select the limit table for an authentication state.
pub fn select_limits(authenticated: bool) -> &'static LimitTable {
    if authenticated {
        &AUTHENTICATED_LIMITS
    } else {
        &UNAUTHENTICATED_LIMITS
    }
}

/// Per-request rate-limit metadata, derived from the policy table.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitInfo {
    pub authenticated: bool,
    pub limits: LimitTable,
    pub used: LimitTable,
    pub remaining: LimitTable,
}

impl RateLimitInfo {
    /// Compute the metadata for an authentication state.
    ///
    /// `used` is a zero-filled placeholder pending a counter backend.
    pub fn for_auth_state(authenticated: bool) -> Self {
        let limits = *select_limits(authenticated);
        let used = LimitTable {
            opensea: 0,
            ai_messages: 0,
            summaries: 0,
            total_tokens: 0,
        };
        let remaining = LimitTable {
            opensea: limits.opensea - used.opensea,
            ai_messages: limits.ai_messages - used.ai_messages,
            summaries: limits.summaries - used.summaries,
            total_tokens: limits.total_tokens - used.total_tokens,
        };
        RateLimitInfo {
            authenticated,
            limits,
            used,
            remaining,
        }
    }
}
