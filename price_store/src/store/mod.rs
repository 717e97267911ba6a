//! The price series store: one fetch path shared by training and prediction.
//!
//! [`PriceStore`] owns a boxed [`DataProvider`] and applies a [`FetchPolicy`]
//! around every call:
//! - a shared rate limiter (`governor`) so a fan-out batch does not burst the
//!   upstream source,
//! - a per-attempt timeout, treated like any other transient failure,
//! - exponential backoff retries for transient failures only,
//! - an optional in-memory cache holding the latest range fetched per symbol.
//!
//! Empty results are `DataUnavailable`, never an empty [`Series`]. That
//! includes results whose every bar was dropped during normalization.

mod batch;
mod policy;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::debug;

pub use batch::{BatchFetch, FetchFailure};
pub use policy::FetchPolicy;

use crate::{
    errors::{StoreError, Unavailable},
    models::{bar::Series, date_range::DateRange},
    providers::DataProvider,
};

pub struct PriceStore {
    provider: Arc<dyn DataProvider>,
    policy: FetchPolicy,
    limiter: DefaultDirectRateLimiter,
    /// symbol -> (range, series); a new range for a symbol replaces the old one.
    cache: Option<Mutex<HashMap<String, (DateRange, Series)>>>,
}

impl PriceStore {
    pub fn new(provider: Arc<dyn DataProvider>, policy: FetchPolicy) -> Self {
        let limiter = RateLimiter::direct(Quota::per_second(policy.requests_per_second));
        let cache = policy.cache.then(|| Mutex::new(HashMap::new()));
        Self {
            provider,
            policy,
            limiter,
            cache,
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches the normalized series of `symbol` over `range`.
    ///
    /// Errors:
    /// - [`StoreError::DataUnavailable`] when the provider fails permanently,
    ///   keeps failing transiently past `max_retries`, times out on every
    ///   attempt, or returns no rows.
    pub async fn fetch_series(&self, symbol: &str, range: DateRange) -> Result<Series, StoreError> {
        if let Some(hit) = self.cached(symbol, range) {
            debug!(%symbol, "series cache hit");
            return Ok(hit);
        }

        let mut attempt = 0;
        let bars = loop {
            self.limiter.until_ready().await;

            let outcome = tokio::time::timeout(
                self.policy.timeout,
                self.provider.fetch_daily_bars(symbol, range),
            )
            .await;

            let cause = match outcome {
                Ok(Ok(bars)) => break bars,
                Ok(Err(e)) if e.is_transient() => Unavailable::Provider(e),
                Ok(Err(e)) => return Err(StoreError::unavailable(symbol, e)),
                Err(_) => Unavailable::TimedOut(self.policy.timeout),
            };

            if attempt >= self.policy.max_retries {
                return Err(StoreError::unavailable(symbol, cause));
            }
            let delay = self.policy.backoff(attempt);
            debug!(%symbol, attempt, ?delay, error = %cause, "retrying fetch");
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        let series = Series::new(symbol, bars);
        if series.is_empty() {
            return Err(StoreError::unavailable(symbol, Unavailable::NoRows));
        }
        debug!(%symbol, bars = series.len(), "fetched series");
        self.remember(range, &series);
        Ok(series)
    }

    fn cached(&self, symbol: &str, range: DateRange) -> Option<Series> {
        let cache = self.cache.as_ref()?;
        let guard = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.get(symbol) {
            Some((cached_range, series)) if *cached_range == range => Some(series.clone()),
            _ => None,
        }
    }

    fn remember(&self, range: DateRange, series: &Series) {
        if let Some(cache) = &self.cache {
            let mut guard = cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.insert(series.symbol().to_string(), (range, series.clone()));
        }
    }

    /// Number of symbols with a cached series.
    pub fn cached_symbols(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .len()
        })
    }

    /// Drops every cached series.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clear();
        }
    }
}
