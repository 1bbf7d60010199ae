//! API route handlers.

pub mod auth;

use crate::auth::middleware::{attach_auth, require_auth, AppState};
use axum::{middleware, routing::get, routing::post, Router};

/// Build the API router with all endpoints.
///
/// Every route runs behind the request gate: handshake endpoints get the
/// annotate-only flavor, session-mutating endpoints require a valid
/// session up front.
pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/challenge", post(auth::request_challenge))
        .route("/api/auth/verify", post(auth::verify_challenge))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/session", get(auth::session_info))
        .route_layer(middleware::from_fn_with_state(state.clone(), attach_auth));

    let protected = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/logout-all", post(auth::logout_all))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public.merge(protected).with_state(state)
}
