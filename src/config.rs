//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Longest session lifetime accepted (browsers cap `Max-Age` at 400 days)
pub const MAX_SESSION_AGE_SECONDS: i64 = 400 * 24 * 60 * 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Deployment environment ("development" or "production")
    pub environment: String,
    pub frontend: FrontendConfig,
    pub github: GitHubConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 5000)
    pub port: u16,
}

/// Single-page frontend the gateway serves
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    /// Base URL (e.g., "http://localhost:5173")
    pub url: String,
}

/// GitHub OAuth app configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Browser-facing authorization page
    pub authorize_url: String,
    /// Server-to-server code exchange endpoint
    pub token_url: String,
    /// REST API root (profile is read from `{api_base_url}/user`)
    pub api_base_url: String,
    /// Requested scope (default: "user")
    pub scope: String,
    /// Callback URL registered with the OAuth app, if it must be sent explicitly
    pub redirect_uri: Option<String>,
    /// Per-request timeout for provider calls
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Session cookie and fallback store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie carrying the access token (default: "github_token")
    pub cookie_name: String,
    /// Cookie carrying the session id in keyed mode (default: "github_session")
    pub session_cookie_name: String,
    /// Cookie and keyed-entry lifetime in seconds (default: 86400 = 24h)
    pub max_age_seconds: i64,
    /// Secondary token store consulted when the cookie is absent
    #[serde(default)]
    pub fallback: FallbackMode,
    /// How long a redeemed authorization code stays blocked (default: 600)
    pub code_retention_seconds: u64,
}

/// Secondary token store selector
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// One process-wide slot holding the most recent token. Single-tenant only.
    #[default]
    SharedSlot,
    /// Session id cookie mapped to a server-side token entry
    Keyed,
    /// Cookie only
    Disabled,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.trim().eq_ignore_ascii_case("json")
    }

    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub fn filter_directives(&self) -> String {
        format!(
            "ghgate={},tower_http=debug",
            self.level.trim().to_ascii_lowercase()
        )
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (GHGATE__*)
    /// 5. Plain variables: GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET,
    ///    FRONTEND_URL, PORT, APP_ENV
    ///
    /// The result is not validated yet; call [`AppConfig::validate`] once
    /// logging is up.
    ///
    /// # Errors
    /// Returns error if a source cannot be read or deserialized
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let plain = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("environment", "development")?
            .set_default("frontend.url", "http://localhost:5173")?
            .set_default("github.client_id", "")?
            .set_default("github.client_secret", "")?
            .set_default(
                "github.authorize_url",
                "https://github.com/login/oauth/authorize",
            )?
            .set_default(
                "github.token_url",
                "https://github.com/login/oauth/access_token",
            )?
            .set_default("github.api_base_url", "https://api.github.com")?
            .set_default("github.scope", "user")?
            .set_default("github.timeout_seconds", 10)?
            .set_default("github.user_agent", concat!("ghgate/", env!("CARGO_PKG_VERSION")))?
            .set_default("session.cookie_name", "github_token")?
            .set_default("session.session_cookie_name", "github_session")?
            .set_default("session.max_age_seconds", 86400)?
            .set_default("session.fallback", "shared_slot")?
            .set_default("session.code_retention_seconds", 600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (GHGATE__*)
            .add_source(
                Environment::with_prefix("GHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("github.client_id", plain("GITHUB_CLIENT_ID"))?
            .set_override_option("github.client_secret", plain("GITHUB_CLIENT_SECRET"))?
            .set_override_option("frontend.url", plain("FRONTEND_URL"))?
            .set_override_option("server.port", plain("PORT"))?
            .set_override_option("environment", plain("APP_ENV"))?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))
    }

    /// Whether cookies must carry the `Secure` attribute
    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case("production")
    }

    /// Where the browser lands after a successful login
    pub fn dashboard_url(&self) -> String {
        format!("{}/dashboard", self.frontend.url.trim_end_matches('/'))
    }

    /// Frontend origin used for CORS (scheme://host[:port])
    pub fn frontend_origin(&self) -> Option<String> {
        url::Url::parse(&self.frontend.url)
            .ok()
            .map(|url| url.origin().ascii_serialization())
    }

    /// Reject configurations that can never serve a successful login.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.github.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_id is required (set GITHUB_CLIENT_ID)".to_string(),
            ));
        }

        if self.github.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "github.client_secret is required (set GITHUB_CLIENT_SECRET)".to_string(),
            ));
        }

        if self.session.max_age_seconds <= 0 {
            return Err(AppError::Config(
                "session.max_age_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.max_age_seconds > MAX_SESSION_AGE_SECONDS {
            return Err(AppError::Config(format!(
                "session.max_age_seconds must not exceed {MAX_SESSION_AGE_SECONDS}"
            )));
        }

        if self.session.code_retention_seconds == 0 {
            return Err(AppError::Config(
                "session.code_retention_seconds must be greater than 0".to_string(),
            ));
        }

        if self.github.timeout_seconds == 0 {
            return Err(AppError::Config(
                "github.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.trim().to_ascii_lowercase().as_str()) {
            return Err(AppError::Config(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if !self.logging.is_json() && !self.logging.format.trim().eq_ignore_ascii_case("pretty") {
            return Err(AppError::Config(
                "logging.format must be \"pretty\" or \"json\"".to_string(),
            ));
        }

        for (key, value) in [
            ("frontend.url", &self.frontend.url),
            ("github.authorize_url", &self.github.authorize_url),
            ("github.token_url", &self.github.token_url),
            ("github.api_base_url", &self.github.api_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("{key} is not a valid URL: {e}")))?;
        }

        if !self.is_production() {
            tracing::warn!(
                environment = %self.environment,
                "Session cookies are issued without the Secure attribute"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            environment: "development".to_string(),
            frontend: FrontendConfig {
                url: "http://localhost:5173".to_string(),
            },
            github: GitHubConfig {
                client_id: "github-client-id".to_string(),
                client_secret: "github-client-secret".to_string(),
                authorize_url: "https://github.com/login/oauth/authorize".to_string(),
                token_url: "https://github.com/login/oauth/access_token".to_string(),
                api_base_url: "https://api.github.com".to_string(),
                scope: "user".to_string(),
                redirect_uri: None,
                timeout_seconds: 10,
                user_agent: "ghgate-test".to_string(),
            },
            session: SessionConfig {
                cookie_name: "github_token".to_string(),
                session_cookie_name: "github_session".to_string(),
                max_age_seconds: 86_400,
                fallback: FallbackMode::SharedSlot,
                code_retention_seconds: 600,
            },
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_development_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn validate_rejects_missing_client_id() {
        let mut config = valid_config();
        config.github.client_id = "   ".to_string();

        let error = config
            .validate()
            .expect_err("blank client id must abort startup");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("github.client_id")
        ));
    }

    #[test]
    fn validate_rejects_missing_client_secret() {
        let mut config = valid_config();
        config.github.client_secret = String::new();

        let error = config
            .validate()
            .expect_err("missing client secret must abort startup");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("github.client_secret")
        ));
    }

    #[test]
    fn validate_rejects_unparseable_frontend_url() {
        let mut config = valid_config();
        config.frontend.url = "not a url".to_string();

        let error = config.validate().expect_err("frontend url must parse");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("frontend.url")
        ));
    }

    #[test]
    fn validate_rejects_zero_session_ttl() {
        let mut config = valid_config();
        config.session.max_age_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_session_ttl_beyond_cookie_limit() {
        let mut config = valid_config();
        config.session.max_age_seconds = i64::MAX;

        let error = config.validate().expect_err("unbounded ttl must abort startup");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("session.max_age_seconds")
        ));

        config.session.max_age_seconds = MAX_SESSION_AGE_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_log_settings() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn logging_settings_drive_subscriber() {
        let logging = LoggingConfig {
            level: "DEBUG".to_string(),
            format: "Json".to_string(),
        };
        assert!(logging.is_json());
        assert_eq!(logging.filter_directives(), "ghgate=debug,tower_http=debug");

        let logging = LoggingConfig::default();
        assert!(!logging.is_json());
        assert_eq!(logging.filter_directives(), "ghgate=info,tower_http=debug");
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let mut config = valid_config();
        config.environment = "Production".to_string();
        assert!(config.is_production());
    }

    #[test]
    fn dashboard_url_trims_trailing_slash() {
        let mut config = valid_config();
        config.frontend.url = "http://localhost:5173/".to_string();
        assert_eq!(config.dashboard_url(), "http://localhost:5173/dashboard");
    }

    #[test]
    fn frontend_origin_drops_path() {
        let mut config = valid_config();
        config.frontend.url = "https://app.example.com/ui/".to_string();
        assert_eq!(
            config.frontend_origin().as_deref(),
            Some("https://app.example.com")
        );
    }

    #[test]
    fn fallback_mode_parses_snake_case() {
        let mode: FallbackMode = serde_json::from_str("\"keyed\"").expect("keyed parses");
        assert_eq!(mode, FallbackMode::Keyed);
        let mode: FallbackMode =
            serde_json::from_str("\"shared_slot\"").expect("shared_slot parses");
        assert_eq!(mode, FallbackMode::SharedSlot);
    }
}
