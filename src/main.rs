//! Walletgate application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Create challenge and session stores and start their TTL sweeps
//! 3. Build the session manager and shared state
//! 4. Build router with gated auth routes
//! 5. Start Axum server

use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use walletgate::{
    auth::{middleware::AppState, SessionManager, TokenCodec},
    config::Config,
    routes,
    store::TtlStore,
};

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Arc::new(Config::from_env().expect("Failed to load config"));
    tracing::info!("Starting walletgate on {}", config.bind_addr);
    tracing::debug!(?config, "Loaded configuration");

    // Stores with independent background sweeps; handles are held for the
    // lifetime of the process
    let challenges = TtlStore::new();
    let sessions = TtlStore::new();
    let _challenge_sweep = challenges.start_sweep(
        Duration::from_secs(config.challenge_sweep_secs),
        "challenges",
    );
    let _session_sweep =
        sessions.start_sweep(Duration::from_secs(config.session_sweep_secs), "sessions");

    let codec = TokenCodec::new(&config.access_token_secret, &config.refresh_token_secret);
    let session_manager =
        SessionManager::new(challenges.clone(), sessions, codec, config.clone());

    let state = AppState::new(session_manager, challenges, config.clone());

    // Explicit CORS: deny all cross-origin requests (single-origin deployment).
    // CorsLayer::new() with no allowed origins rejects all CORS preflight requests.
    let cors = CorsLayer::new();

    let app = routes::api_router(state).layer(cors);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
