//! Authorization code replay guard
//!
//! Remembers digests of redeemed authorization codes so a replayed
//! callback is refused locally instead of being forwarded to GitHub.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::{Engine as _, engine::general_purpose};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

const DEFAULT_MAX_TRACKED_CODES: usize = 10_000;

/// Single-use ledger for authorization codes
pub struct CodeLedger {
    /// Code digest -> time of first redemption
    entries: RwLock<HashMap<String, Instant>>,
    retention: Duration,
    max_tracked: usize,
}

impl CodeLedger {
    /// Create a ledger that blocks a code for `retention` after first use
    pub fn new(retention: Duration) -> Self {
        Self::with_max_tracked(retention, DEFAULT_MAX_TRACKED_CODES)
    }

    pub fn with_max_tracked(retention: Duration, max_tracked: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
            max_tracked: max_tracked.max(1),
        }
    }

    /// Claim a code for redemption
    ///
    /// Returns `false` if the code was already claimed within the
    /// retention window. A claim is never released, even if the
    /// exchange that follows fails.
    pub async fn claim(&self, code: &str) -> bool {
        let digest = digest(code);
        let mut entries = self.entries.write().await;

        if let Some(claimed_at) = entries.get(&digest) {
            if claimed_at.elapsed() < self.retention {
                return false;
            }
        }

        if entries.len() >= self.max_tracked {
            let retention = self.retention;
            entries.retain(|_, claimed_at| claimed_at.elapsed() < retention);
        }
        if entries.len() >= self.max_tracked {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, claimed_at)| **claimed_at)
                .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(digest, Instant::now());
        true
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn digest(code: &str) -> String {
    general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(code.as_bytes()))
}
