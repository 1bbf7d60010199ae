//! Request gate: per-request authentication and rate-limit annotation.
//!
//! Two middleware flavors share one resolution path:
//! - [`attach_auth`] annotates every request/response and lets
//!   unauthenticated traffic through;
//! - [`require_auth`] short-circuits with 401 before the handler runs.
//!
//! The development identity bypass is isolated in
//! [`DevModeIdentityResolver`], constructed once at startup only when the
//! config enables dev mode. Production builds carry `None` and the query
//! parameter path simply does not exist.

use crate::auth::session::SessionManager;
use crate::config::Config;
use crate::error::AppError;
use crate::models::{is_valid_address, normalize_address, SessionInfo, StoredChallenge};
use crate::ratelimit::RateLimitInfo;
use crate::store::{now_ms, TtlStore};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: SessionManager,
    pub challenges: TtlStore<StoredChallenge>,
    pub config: Arc<Config>,
    /// `Some` only when dev mode passed both config checks.
    pub dev_resolver: Option<DevModeIdentityResolver>,
}

impl AppState {
    pub fn new(
        session_manager: SessionManager,
        challenges: TtlStore<StoredChallenge>,
        config: Arc<Config>,
    ) -> Self {
        let dev_resolver = config
            .dev_mode
            .then(|| DevModeIdentityResolver::new(config.session_duration_ms()));
        Self {
            session_manager,
            challenges,
            config,
            dev_resolver,
        }
    }
}

/// Accepts a wallet address from a query parameter as an authenticated
/// identity. Dev mode only; never constructed in production.
#[derive(Clone)]
pub struct DevModeIdentityResolver {
    session_duration_ms: u64,
}

impl DevModeIdentityResolver {
    fn new(session_duration_ms: u64) -> Self {
        Self {
            session_duration_ms,
        }
    }

    /// Resolve `?address=0x...` or `?walletAddress=0x...` into a
    /// time-boxed authenticated identity.
    pub fn resolve(&self, query: Option<&str>) -> Option<SessionInfo> {
        let address = dev_address_from_query(query?)?;
        if !is_valid_address(&address) {
            return None;
        }
        let address = normalize_address(&address);
        tracing::warn!(
            wallet = %address,
            "DEV MODE: query-parameter identity accepted without signature"
        );
        let expires_at = now_ms() + self.session_duration_ms;
        Some(SessionInfo {
            is_authenticated: true,
            wallet_address: Some(address),
            session_id: None,
            expires_at: Some(expires_at),
            is_expired: Some(false),
            time_remaining_ms: Some(self.session_duration_ms),
        })
    }
}

fn dev_address_from_query(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "address" || key == "walletAddress" {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Extract a Bearer token from an Authorization header value.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(|t| t.trim())
}

/// Resolve the request's authentication state.
fn resolve_session(state: &AppState, parts_headers: &axum::http::HeaderMap, query: Option<&str>) -> SessionInfo {
    let bearer = parts_headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer_token);

    match bearer {
        Some(token) => state.session_manager.validate(token),
        None => state
            .dev_resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(query))
            .unwrap_or_else(SessionInfo::unauthenticated),
    }
}

/// Middleware: annotate the request with its authentication state and the
/// response with auth + rate-limit headers. Never rejects.
pub async fn attach_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    gate(state, request, next, false).await
}

/// Middleware: like [`attach_auth`], but rejects unauthenticated requests
/// with 401 before the handler runs.
pub async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    gate(state, request, next, true).await
}

async fn gate(state: AppState, mut request: Request, next: Next, required: bool) -> Response {
    let query = request.uri().query().map(str::to_owned);
    let info = resolve_session(&state, request.headers(), query.as_deref());

    if required && !info.is_authenticated {
        let mut response = AppError::Unauthenticated.into_response();
        annotate_response(&mut response, &info);
        return response;
    }

    request.extensions_mut().insert(info.clone());
    let mut response = next.run(request).await;
    annotate_response(&mut response, &info);
    response
}

/// Attach authentication and rate-limit metadata as response headers.
fn annotate_response(response: &mut Response, info: &SessionInfo) {
    let headers = response.headers_mut();

    headers.insert(
        "x-wallet-authenticated",
        HeaderValue::from_static(if info.is_authenticated { "true" } else { "false" }),
    );
    if let Some(wallet) = &info.wallet_address {
        if let Ok(value) = HeaderValue::from_str(wallet) {
            headers.insert("x-wallet-address", value);
        }
    }
    if let Some(session_id) = &info.session_id {
        if let Ok(value) = HeaderValue::from_str(session_id) {
            headers.insert("x-session-id", value);
        }
    }
    if let Some(expires_at) = info.expires_at {
        headers.insert("x-session-expires-at", HeaderValue::from(expires_at));
    }
    if let Some(remaining) = info.time_remaining_ms {
        headers.insert("x-session-time-remaining", HeaderValue::from(remaining));
    }

    let rate = RateLimitInfo::for_auth_state(info.is_authenticated);
    let pairs: [(HeaderName, HeaderName, u32, u32); 4] = [
        (
            HeaderName::from_static("x-ratelimit-opensea-limit"),
            HeaderName::from_static("x-ratelimit-opensea-remaining"),
            rate.limits.opensea,
            rate.remaining.opensea,
        ),
        (
            HeaderName::from_static("x-ratelimit-ai-messages-limit"),
            HeaderName::from_static("x-ratelimit-ai-messages-remaining"),
            rate.limits.ai_messages,
            rate.remaining.ai_messages,
        ),
        (
            HeaderName::from_static("x-ratelimit-summaries-limit"),
            HeaderName::from_static("x-ratelimit-summaries-remaining"),
            rate.limits.summaries,
            rate.remaining.summaries,
        ),
        (
            HeaderName::from_static("x-ratelimit-tokens-limit"),
            HeaderName::from_static("x-ratelimit-tokens-remaining"),
            rate.limits.total_tokens,
            rate.remaining.total_tokens,
        ),
    ];
    for (limit_name, remaining_name, limit, remaining) in pairs {
        headers.insert(limit_name, HeaderValue::from(limit));
        headers.insert(remaining_name, HeaderValue::from(remaining));
    }
}

/// Authenticated session extractor.
///
/// Reads the `SessionInfo` the gate attached to the request and rejects
/// with 401 if the request is not authenticated. Handlers that only need
/// optional state can extract `Extension<SessionInfo>` directly.
pub struct AuthSession(pub SessionInfo);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let info = parts
            .extensions
            .get::<SessionInfo>()
            .cloned()
            .ok_or_else(|| {
                AppError::Internal("Request gate did not run before AuthSession".to_string())
            })?;

        if !info.is_authenticated {
            return Err(AppError::Unauthenticated);
        }

        Ok(AuthSession(info))
    }
}
