//! Common test utilities for E2E tests

#![allow(dead_code)]

use ghgate::{AppState, config};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client-id";
pub const FRONTEND_URL: &str = "http://localhost:5173";

/// Test server instance
///
/// Runs the real router on an ephemeral port with a mock GitHub behind it.
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub github: MockServer,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server using the shared-slot fallback
    pub async fn new() -> Self {
        Self::with_fallback(config::FallbackMode::SharedSlot).await
    }

    /// Create a new test server with the given fallback store
    pub async fn with_fallback(fallback: config::FallbackMode) -> Self {
        let github = MockServer::start().await;
        let config = test_config(&github, fallback);

        ghgate::metrics::init_metrics();
        let state = AppState::new(config).unwrap();

        // Redirects stay visible to the tests
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = ghgate::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            github,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET with an optional raw `Cookie` header
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header("Cookie", cookie);
        }
        request.send().await.unwrap()
    }

    /// Mock GitHub's token endpoint: `code` is exchanged for `token`
    pub async fn mock_exchange(&self, code: &str, token: &str) {
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_partial_json(json!({ "code": code })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": token,
                "token_type": "bearer",
                "scope": "user"
            })))
            .mount(&self.github)
            .await;
    }

    /// Mock GitHub's `/user` endpoint for one token
    pub async fn mock_profile(&self, token: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.github)
            .await;
    }

    /// Complete the callback for `code` and return the session cookie pair
    pub async fn login(&self, code: &str) -> String {
        let response = self
            .get(&format!("/auth/github/callback?code={code}"), None)
            .await;
        assert_eq!(response.status(), 302, "login callback must redirect");
        cookie_pairs(&response)
    }
}

/// `name=value` pairs of every non-empty `Set-Cookie`, joined for a `Cookie` header
pub fn cookie_pairs(response: &reqwest::Response) -> String {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| raw.split(';').next())
        .filter(|pair| pair.split_once('=').is_some_and(|(_, v)| !v.is_empty()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Raw `Set-Cookie` header values
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok().map(ToString::to_string))
        .collect()
}

fn test_config(github: &MockServer, fallback: config::FallbackMode) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        environment: "development".to_string(),
        frontend: config::FrontendConfig {
            url: FRONTEND_URL.to_string(),
        },
        github: config::GitHubConfig {
            client_id: CLIENT_ID.to_string(),
            client_secret: "test-client-secret".to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: format!("{}/login/oauth/access_token", github.uri()),
            api_base_url: github.uri(),
            scope: "user".to_string(),
            redirect_uri: None,
            timeout_seconds: 5,
            user_agent: "ghgate-e2e".to_string(),
        },
        session: config::SessionConfig {
            cookie_name: "github_token".to_string(),
            session_cookie_name: "github_session".to_string(),
            max_age_seconds: 86_400,
            fallback,
            code_retention_seconds: 600,
        },
        logging: config::LoggingConfig::default(),
    }
}
