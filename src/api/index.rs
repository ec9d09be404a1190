//! Service index and liveness endpoints

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Public routes of the gateway, advertised by `GET /`
#[derive(Debug, Serialize)]
struct Endpoints {
    login: &'static str,
    callback: &'static str,
    user: &'static str,
    logout: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct IndexResponse {
    status: &'static str,
    message: &'static str,
    endpoints: Endpoints,
}

/// GET /
async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        status: "ok",
        message: "GitHub OAuth gateway running",
        endpoints: Endpoints {
            login: "/auth/github",
            callback: "/auth/github/callback",
            user: "/auth/user",
            logout: "/auth/logout",
            status: "/auth/status",
        },
    })
}

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}

/// Create index router
///
/// Routes:
/// - GET / - Service description and endpoint list
/// - GET /health - Liveness probe
pub fn index_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
}
