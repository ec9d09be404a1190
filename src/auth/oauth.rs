//! GitHub OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow with GitHub on behalf
//! of the single-page frontend.
//!
//! Perceived session status:
//! `Unauthenticated -> PendingAuthorization -> Authenticated -> Unauthenticated`
//! (the last step on logout or when GitHub rejects the token).

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::AppError;
use crate::provider::{AuthorizationRequest, ExchangeError, ProfileError, UserProfile};

/// Create authentication router
///
/// Routes:
/// - GET /auth/github - Redirect to GitHub
/// - GET /auth/github/callback - OAuth callback
/// - GET /auth/user - Current user's GitHub profile
/// - GET /auth/logout - Logout
/// - GET /auth/status - Local session presence
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/github", get(github_redirect))
        .route("/auth/github/callback", get(github_callback))
        .route("/auth/user", get(current_user))
        .route("/auth/logout", get(logout))
        .route("/auth/status", get(status))
}

// =============================================================================
// GitHub OAuth
// =============================================================================

/// GET /auth/github
///
/// Redirects user to GitHub authorization page with client_id and scope.
/// No network call, no state change.
async fn github_redirect(State(state): State<AppState>) -> Result<Response, AppError> {
    let github = &state.config.github;
    let request = AuthorizationRequest {
        client_id: &github.client_id,
        scope: &github.scope,
        redirect_uri: github.redirect_uri.as_deref(),
    };
    let url = request
        .url(&github.authorize_url)
        .map_err(|e| AppError::Config(format!("github.authorize_url: {e}")))?;

    tracing::info!("Redirecting to GitHub for authorization");
    Ok(found(url.as_str()))
}

/// Query parameters from GitHub callback
#[derive(Debug, Deserialize)]
struct GitHubCallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Set by GitHub when the user denies access
    error: Option<String>,
    error_description: Option<String>,
}

/// GET /auth/github/callback
///
/// Handles OAuth callback from GitHub.
///
/// # Steps
/// 1. Require a code (400 without contacting GitHub)
/// 2. Refuse codes that were already redeemed
/// 3. Exchange code for access token
/// 4. Save token to cookie and fallback store
/// 5. Redirect to the frontend dashboard
async fn github_callback(
    State(state): State<AppState>,
    query: Result<Query<GitHubCallbackQuery>, QueryRejection>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|rejection| {
        tracing::error!(%rejection, "Malformed callback query");
        AppError::MissingCode
    })?;

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::error!(
            provider_error = ?query.error,
            provider_error_description = ?query.error_description,
            "No code received from GitHub"
        );
        return Err(AppError::MissingCode);
    };

    tracing::info!("Received authorization code from GitHub");

    if !state.codes.claim(&code).await {
        tracing::warn!("Authorization code replayed; refusing without contacting GitHub");
        return Err(AppError::ProviderRejection(
            "The authorization code has already been used.".to_string(),
        ));
    }

    let token = match state.provider.exchange(&code).await {
        Ok(token) => token,
        Err(ExchangeError::Rejected { error, description }) => {
            tracing::error!(%error, %description, "Token exchange failed");
            return Err(AppError::ProviderRejection(description));
        }
        Err(error) => {
            tracing::error!(%error, "OAuth callback error");
            return Err(AppError::Upstream(
                "Failed to authenticate with GitHub".to_string(),
            ));
        }
    };

    let jar = state.sessions.save(jar, token).await;
    tracing::info!("Access token obtained and stored");

    Ok((jar, found(&state.config.dashboard_url())).into_response())
}

// =============================================================================
// Session
// =============================================================================

/// GET /auth/user
///
/// Fetches the authenticated user's GitHub profile with the resolved token.
/// A 401 from GitHub clears the session before answering; any other
/// failure leaves it untouched.
async fn current_user(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<UserProfile>, Response> {
    let Some(token) = state.sessions.resolve(&jar).await else {
        tracing::error!("No token available - user not authenticated");
        return Err(AppError::Unauthenticated.into_response());
    };

    match state.provider.fetch_profile(&token).await {
        Ok(profile) => {
            tracing::info!(login = profile.login().unwrap_or_default(), "User data fetched");
            Ok(Json(profile))
        }
        Err(ProfileError::Unauthorized) => {
            tracing::warn!("GitHub rejected stored token; clearing session");
            let jar = state.sessions.clear(jar).await;
            Err((jar, AppError::TokenExpired).into_response())
        }
        Err(error) => {
            tracing::error!(%error, "Failed to fetch user");
            Err(AppError::Upstream("Failed to fetch user data".to_string()).into_response())
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// GET /auth/logout
///
/// Clears stored token and cookie. Always succeeds.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = state.sessions.clear(jar).await;
    tracing::info!("User logged out");

    (
        jar,
        Json(MessageResponse {
            message: "Logged out successfully",
        }),
    )
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    authenticated: bool,
}

/// GET /auth/status
///
/// Reports whether a token is present locally. GitHub is not consulted,
/// so a revoked token still reads as authenticated until `/auth/user`
/// discovers it.
async fn status(State(state): State<AppState>, jar: CookieJar) -> Json<StatusResponse> {
    Json(StatusResponse {
        authenticated: state.sessions.is_authenticated(&jar).await,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// 302 Found (`Redirect::to` answers 303)
fn found(location: &str) -> Response {
    match axum::http::HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(error) => {
            tracing::error!(%error, "Redirect target is not a valid header value");
            AppError::Config("invalid redirect target".to_string()).into_response()
        }
    }
}
