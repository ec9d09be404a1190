//! OAuth provider access
//!
//! The controller talks to the provider only through [`ProviderClient`],
//! whose two operations return tagged outcomes instead of raw HTTP
//! statuses. Only [`ProfileError::Unauthorized`] may invalidate a session.

mod github;

pub use github::GitHubClient;

use axum::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Browser redirect to the provider's consent page
///
/// Built fresh for every authorize call; never stored.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    pub client_id: &'a str,
    pub scope: &'a str,
    pub redirect_uri: Option<&'a str>,
}

impl AuthorizationRequest<'_> {
    /// Append the request parameters to the provider's authorize URL
    pub fn url(&self, authorize_url: &str) -> Result<url::Url, url::ParseError> {
        let mut url = url::Url::parse(authorize_url)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", self.client_id);
            query.append_pair("scope", self.scope);
            if let Some(redirect_uri) = self.redirect_uri {
                query.append_pair("redirect_uri", redirect_uri);
            }
        }
        Ok(url)
    }
}

/// Opaque bearer credential issued by the provider
///
/// Never parsed. `Debug` is redacted so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw value, for the bearer header and the session cookie only
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Profile document returned by the provider, forwarded as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(serde_json::Value);

impl UserProfile {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Provider login, if present
    pub fn login(&self) -> Option<&str> {
        self.0.get("login").and_then(|v| v.as_str())
    }
}

/// Failed authorization code exchange
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// Structured refusal from the provider (bad or expired code, bad credentials)
    #[error("{description}")]
    Rejected { error: String, description: String },

    /// Token endpoint answered with a non-success status
    #[error("token endpoint returned {0}")]
    Status(StatusCode),

    /// Network failure, timeout, or undecodable body
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Failed profile lookup
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The provider no longer accepts the token
    #[error("access token rejected by provider")]
    Unauthorized,

    /// Any other non-success status (rate limits, outages)
    #[error("profile endpoint returned {0}")]
    Status(StatusCode),

    /// Network failure, timeout, or undecodable body
    #[error("profile request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Server-to-server operations against the OAuth provider
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Redeem a one-time authorization code for an access token
    async fn exchange(&self, code: &str) -> Result<AccessToken, ExchangeError>;

    /// Fetch the profile of the token's owner
    async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, ProfileError>;
}
