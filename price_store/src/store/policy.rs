use std::{num::NonZeroU32, time::Duration};

use nonzero_ext::nonzero;

/// How the store talks to a provider.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Upper bound on a single provider call. Elapsing counts as a transient
    /// failure; once retries are exhausted it is `DataUnavailable`.
    pub timeout: Duration,

    /// Retries after the first attempt, for transient failures only.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on every further retry.
    pub base_delay: Duration,

    /// Provider calls allowed per second across all concurrent fetches.
    pub requests_per_second: NonZeroU32,

    /// Keep fetched series in memory, keyed by (symbol, range).
    pub cache: bool,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            requests_per_second: nonzero!(2u32),
            cache: true,
        }
    }
}

impl FetchPolicy {
    /// Delay before retry number `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}
