//! Session management
//!
//! The access token travels in an HttpOnly cookie. A secondary store is
//! consulted only when that cookie is absent:
//! - `SharedSlot`: one process-wide token, last writer wins (single-tenant)
//! - `Keyed`: a session id cookie naming a server-side entry
//! - `Disabled`: cookie only

use std::collections::HashMap;

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use tokio::sync::RwLock;

use crate::config::{AppConfig, FallbackMode, MAX_SESSION_AGE_SECONDS};
use crate::provider::AccessToken;

/// Server-side entry in keyed mode
#[derive(Debug, Clone)]
struct KeyedEntry {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl KeyedEntry {
    fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

enum Fallback {
    Disabled,
    SharedSlot(RwLock<Option<AccessToken>>),
    Keyed(RwLock<HashMap<String, KeyedEntry>>),
}

/// Cookie attributes shared by every cookie the store writes
#[derive(Debug, Clone)]
struct CookieSettings {
    token_name: String,
    session_name: String,
    secure: bool,
    max_age_seconds: i64,
}

/// Resolves, saves and clears the current browser's access token
pub struct SessionStore {
    cookies: CookieSettings,
    fallback: Fallback,
}

impl SessionStore {
    pub fn new(config: &AppConfig) -> Self {
        let fallback = match config.session.fallback {
            FallbackMode::Disabled => Fallback::Disabled,
            FallbackMode::SharedSlot => {
                tracing::warn!(
                    "Session fallback uses a single process-wide token slot; not safe for multiple users"
                );
                Fallback::SharedSlot(RwLock::new(None))
            }
            FallbackMode::Keyed => Fallback::Keyed(RwLock::new(HashMap::new())),
        };

        Self {
            cookies: CookieSettings {
                token_name: config.session.cookie_name.clone(),
                session_name: config.session.session_cookie_name.clone(),
                secure: config.is_production(),
                max_age_seconds: config
                    .session
                    .max_age_seconds
                    .clamp(1, MAX_SESSION_AGE_SECONDS),
            },
            fallback,
        }
    }

    /// Token for the calling browser
    ///
    /// The cookie wins over the fallback store. Never mutates state.
    pub async fn resolve(&self, jar: &CookieJar) -> Option<AccessToken> {
        if let Some(token) = cookie_value(jar, &self.cookies.token_name) {
            return Some(AccessToken::new(token));
        }

        match &self.fallback {
            Fallback::Disabled => None,
            Fallback::SharedSlot(slot) => slot.read().await.clone(),
            Fallback::Keyed(entries) => {
                let session_id = cookie_value(jar, &self.cookies.session_name)?;
                let entries = entries.read().await;
                entries
                    .get(session_id)
                    .filter(|entry| !entry.is_expired())
                    .map(|entry| entry.token.clone())
            }
        }
    }

    /// Whether any token is available locally (no provider validation)
    pub async fn is_authenticated(&self, jar: &CookieJar) -> bool {
        self.resolve(jar).await.is_some()
    }

    /// Persist a freshly issued token
    ///
    /// Writes the fallback store and returns the jar with the token cookie set.
    pub async fn save(&self, jar: CookieJar, token: AccessToken) -> CookieJar {
        let jar = match &self.fallback {
            Fallback::Disabled => jar,
            Fallback::SharedSlot(slot) => {
                *slot.write().await = Some(token.clone());
                jar
            }
            Fallback::Keyed(entries) => {
                let session_id = generate_session_id();
                let entry = KeyedEntry {
                    token: token.clone(),
                    expires_at: Utc::now() + Duration::seconds(self.cookies.max_age_seconds),
                };

                let mut entries = entries.write().await;
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired());
                let pruned = before - entries.len();
                if pruned > 0 {
                    tracing::debug!(pruned, "Pruned expired sessions");
                }
                // A browser logging in again replaces its previous entry
                if let Some(previous) = cookie_value(&jar, &self.cookies.session_name) {
                    entries.remove(previous);
                }
                entries.insert(session_id.clone(), entry);
                drop(entries);

                jar.add(self.build_cookie(self.cookies.session_name.clone(), session_id))
            }
        };

        use crate::metrics::SESSION_EVENTS_TOTAL;
        SESSION_EVENTS_TOTAL.with_label_values(&["saved"]).inc();

        jar.add(self.build_cookie(self.cookies.token_name.clone(), token.secret().to_string()))
    }

    /// Forget the calling browser's token everywhere
    ///
    /// Empties the fallback store and returns the jar with removal
    /// cookies. Idempotent.
    pub async fn clear(&self, jar: CookieJar) -> CookieJar {
        let jar = match &self.fallback {
            Fallback::Disabled => jar,
            Fallback::SharedSlot(slot) => {
                *slot.write().await = None;
                jar
            }
            Fallback::Keyed(entries) => {
                if let Some(session_id) = cookie_value(&jar, &self.cookies.session_name) {
                    entries.write().await.remove(session_id);
                }
                jar.remove(self.removal_cookie(self.cookies.session_name.clone()))
            }
        };

        use crate::metrics::SESSION_EVENTS_TOTAL;
        SESSION_EVENTS_TOTAL.with_label_values(&["cleared"]).inc();

        jar.remove(self.removal_cookie(self.cookies.token_name.clone()))
    }

    fn build_cookie(&self, name: String, value: String) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .http_only(true)
            .secure(self.cookies.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.cookies.max_age_seconds))
            .build()
    }

    fn removal_cookie(&self, name: String) -> Cookie<'static> {
        Cookie::build(name)
            .path("/")
            .http_only(true)
            .secure(self.cookies.secure)
            .same_site(SameSite::Lax)
            .build()
    }
}

fn cookie_value<'a>(jar: &'a CookieJar, name: &str) -> Option<&'a str> {
    jar.get(name)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
}

/// Random 256-bit session id, URL-safe base64
fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
