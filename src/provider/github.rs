//! GitHub OAuth provider client
//!
//! Implements the server-to-server half of the authorization code flow:
//! code exchange at `login/oauth/access_token` and the `/user` lookup.

use std::time::{Duration, Instant};

use axum::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use super::{AccessToken, ExchangeError, ProfileError, ProviderClient, UserProfile};
use crate::config::GitHubConfig;
use crate::error::AppError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// reqwest-backed [`ProviderClient`] for GitHub (or a GitHub Enterprise host)
pub struct GitHubClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    profile_url: String,
    redirect_uri: Option<String>,
}

/// Token endpoint request body
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

/// Token endpoint response
///
/// GitHub answers 200 for refused codes too, with `error` set instead
/// of `access_token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GitHubClient {
    /// Build a client with the configured timeout and endpoints.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be constructed
    pub fn new(config: &GitHubConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(CONNECT_TIMEOUT.min(Duration::from_secs(config.timeout_seconds)))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            profile_url: format!("{}/user", config.api_base_url.trim_end_matches('/')),
            redirect_uri: config.redirect_uri.clone(),
        })
    }

    async fn request_token(&self, code: &str) -> Result<AccessToken, ExchangeError> {
        let body = TokenRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            code,
            redirect_uri: self.redirect_uri.as_deref(),
        };

        let response = self
            .http
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(ExchangeError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExchangeError::Status(status));
        }

        let payload: TokenResponse = response.json().await.map_err(ExchangeError::Transport)?;

        if let Some(error) = payload.error {
            let description = payload
                .error_description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| error.clone());
            return Err(ExchangeError::Rejected { error, description });
        }

        match payload.access_token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(AccessToken::new(token)),
            None => Err(ExchangeError::Rejected {
                error: "missing_access_token".to_string(),
                description: "GitHub did not return an access token".to_string(),
            }),
        }
    }

    async fn request_profile(&self, token: &AccessToken) -> Result<UserProfile, ProfileError> {
        let response = self
            .http
            .get(&self.profile_url)
            .header(AUTHORIZATION, format!("Bearer {}", token.secret()))
            .header(ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await
            .map_err(ProfileError::Transport)?;

        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ProfileError::Unauthorized),
            status if !status.is_success() => Err(ProfileError::Status(status)),
            _ => response
                .json::<UserProfile>()
                .await
                .map_err(ProfileError::Transport),
        }
    }
}

fn observe(operation: &str, outcome: &str, started: Instant) {
    use crate::metrics::{PROVIDER_REQUEST_DURATION_SECONDS, PROVIDER_REQUESTS_TOTAL};

    PROVIDER_REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
}

#[async_trait]
impl ProviderClient for GitHubClient {
    async fn exchange(&self, code: &str) -> Result<AccessToken, ExchangeError> {
        let started = Instant::now();
        let result = self.request_token(code).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ExchangeError::Rejected { .. }) => "rejected",
            Err(ExchangeError::Status(_)) => "status",
            Err(ExchangeError::Transport(_)) => "transport",
        };
        observe("exchange", outcome, started);

        result
    }

    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, ProfileError> {
        let started = Instant::now();
        let result = self.request_profile(token).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(ProfileError::Unauthorized) => "unauthorized",
            Err(ProfileError::Status(_)) => "status",
            Err(ProfileError::Transport(_)) => "transport",
        };
        observe("fetch_profile", outcome, started);

        result
    }
}
