//! API layer
//!
//! HTTP handlers outside the OAuth flow:
//! - Service index and health check
//! - Metrics (Prometheus)

mod index;
pub mod metrics;

pub use index::index_router;
pub use metrics::metrics_router;
