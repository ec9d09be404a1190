//! GitHub OAuth authentication
//!
//! Handles:
//! - GitHub OAuth flow
//! - Session management
//! - Authorization code replay protection

pub mod codes;
mod oauth;
pub mod session;

pub use codes::CodeLedger;
pub use oauth::auth_router;
pub use session::SessionStore;
