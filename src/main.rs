//! Walletgate application entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build the in-memory session store
//! 3. Build router with auth routes
//! 4. Apply CORS whitelist (credentialed) + security headers
//! 5. Start Axum server

use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use walletgate::{
    auth::middleware::AppState, config::Config, middleware::security_headers, routes,
    storage::session::SessionStore,
};

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting walletgate on {}", config.bind_addr);

    let sessions = Arc::new(SessionStore::new(config.session_ttl_secs));

    // Credentialed CORS: only whitelisted origins may call with the session
    // cookie attached, mirroring the extension + local frontend setup
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .expect("Invalid origin in ALLOWED_ORIGINS")
        })
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let state = AppState {
        sessions,
        config: Arc::new(config.clone()),
    };

    let app = routes::api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
