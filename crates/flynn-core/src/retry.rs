//! Read-timeout retry policy.
//!
//! Governs only transport read-timeouts: a timed-out stream attempt may be
//! reissued with the same body and headers, reusing the decoder so the
//! accumulated text survives. Malformed payloads and non-2xx responses are
//! never retried.

use serde::{Deserialize, Serialize};

/// Default maximum read-timeout retries per logical request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry behavior for transport read-timeouts.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Whether a read-timeout reissues the request instead of failing.
    #[serde(default)]
    pub retry_on_read_timeout: bool,
    /// Maximum reissues per logical request (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_on_read_timeout: false,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries read-timeouts up to the default attempt cap.
    #[must_use]
    pub fn retrying() -> Self {
        Self {
            retry_on_read_timeout: true,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Whether attempt number `attempt` (zero-based) may be reissued.
    #[must_use]
    pub fn allows_retry(&self, attempt: u32) -> bool {
        self.retry_on_read_timeout && attempt < self.max_retries
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
