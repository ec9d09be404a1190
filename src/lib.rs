//! ghgate - GitHub OAuth gateway for single-page frontends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /auth/* OAuth and session endpoints                      │
//! │  - Service index, health, metrics                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Session Layer                           │
//! │  - Token cookie + fallback store                            │
//! │  - Authorization code replay guard                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Provider Layer                          │
//! │  - GitHub token exchange and profile lookup (reqwest)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: Service index, health and metrics handlers
//! - `auth`: GitHub OAuth flow and session management
//! - `provider`: OAuth provider client
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// OAuth provider (GitHub in production, a mock in tests)
    pub provider: Arc<dyn provider::ProviderClient>,

    /// Token cookie and fallback store
    pub sessions: Arc<auth::SessionStore>,

    /// Redeemed authorization codes
    pub codes: Arc<auth::CodeLedger>,
}

impl AppState {
    /// Initialize application state with the GitHub provider client
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let provider = provider::GitHubClient::new(&config.github)?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Initialize application state around an existing provider client
    pub fn with_provider(
        config: config::AppConfig,
        provider: Arc<dyn provider::ProviderClient>,
    ) -> Self {
        let sessions = auth::SessionStore::new(&config);
        let codes =
            auth::CodeLedger::new(Duration::from_secs(config.session.code_retention_seconds));

        tracing::info!(
            fallback = ?config.session.fallback,
            production = config.is_production(),
            "Application state initialized"
        );

        Self {
            config: Arc::new(config),
            provider,
            sessions: Arc::new(sessions),
            codes: Arc::new(codes),
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::trace::TraceLayer;

    let cors_layer = build_cors_layer(&state.config);

    Router::new()
        .merge(api::index_router())
        .merge(auth::auth_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

/// CORS for the frontend origin, with credentials so the session cookie
/// is sent on cross-origin API calls.
fn build_cors_layer(config: &config::AppConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    let origin = config.frontend_origin();
    match origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin([origin]),
        _ => {
            tracing::error!(
                origin = ?origin,
                "Failed to derive CORS origin from frontend URL; denying cross-origin requests"
            );
            layer
        }
    }
}
