//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, the unified interface for
//! fetching daily bars from any market data source (a vendor HTTP API, a
//! directory of downloaded files, an in-memory fixture).
//!
//! Each concrete provider implements [`DataProvider`] to handle its own
//! transport and decoding. The trait is async and object safe, so callers pick
//! a provider at runtime and hold it as `Arc<dyn DataProvider>`.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use price_store::models::{bar::Bar, date_range::DateRange};
//! use price_store::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl DataProvider for MyProvider {
//!     async fn fetch_daily_bars(
//!         &self,
//!         _symbol: &str,
//!         _range: DateRange,
//!     ) -> Result<Vec<Bar>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod csv_file;
pub mod yahoo;

use std::path::PathBuf;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

use crate::models::{bar::Bar, date_range::DateRange};

/// Trait for fetching daily bars from a market data source.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches the daily bars of `symbol` for every trading day in `range`.
    ///
    /// Implementations return bars in any order; [`Series`](crate::models::bar::Series)
    /// normalizes them. An empty vector means the source had no rows.
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Bar>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// A default header value contains invalid characters.
    #[snafu(display("Invalid header value: {source}"))]
    InvalidHeader {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with a non-success status.
    #[snafu(display("API error (HTTP {status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded into bars.
    #[snafu(display("Failed to decode provider response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// A local file could not be read.
    #[snafu(display("Failed to read {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// A local file was not valid CSV in the expected layout.
    #[snafu(display("Malformed price file {}: {source}", path.display()))]
    Csv {
        path: PathBuf,
        source: csv::Error,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },
}

/// Checks that a ticker can be placed in the request path as-is.
pub fn validate_symbol(symbol: &str) -> Result<(), ProviderError> {
    let valid = !symbol.is_empty()
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(())
    } else {
        ValidationSnafu {
            message: format!("unsupported ticker symbol {symbol:?}"),
        }
        .fail()
    }
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, throttling (HTTP 429) and server errors (5xx) are
    /// transient. Everything else fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Decode { .. }
            | ProviderError::Io { .. }
            | ProviderError::Csv { .. }
            | ProviderError::Validation { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::NaiveDate;
    use snafu::ResultExt;

    use super::*;

    struct FixtureProvider {
        bars: HashMap<String, Vec<Bar>>,
    }

    #[async_trait]
    impl DataProvider for FixtureProvider {
        async fn fetch_daily_bars(
            &self,
            symbol: &str,
            range: DateRange,
        ) -> Result<Vec<Bar>, ProviderError> {
            Ok(self
                .bars
                .get(symbol)
                .map(|bars| {
                    bars.iter()
                        .filter(|b| range.contains(b.date))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl DataProvider for FailingProvider {
        async fn fetch_daily_bars(
            &self,
            _symbol: &str,
            _range: DateRange,
        ) -> Result<Vec<Bar>, ProviderError> {
            ApiSnafu {
                status: 404u16,
                message: "not found",
            }
            .fail()
        }
    }

    // Chosen at runtime; only the trait contract is visible to the caller.
    fn get_provider(name: &str) -> Box<dyn DataProvider> {
        if name == "fixture" {
            let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
            let bar = Bar {
                date,
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                adj_close: 1.0,
                volume: 10,
            };
            Box::new(FixtureProvider {
                bars: HashMap::from([("AAPL".to_string(), vec![bar])]),
            })
        } else {
            Box::new(FailingProvider)
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_dynamic_provider() {
        let provider = get_provider("fixture");
        let bars = provider.fetch_daily_bars("AAPL", january()).await.unwrap();
        assert_eq!(bars.len(), 1);

        let provider = get_provider("failing");
        let err = provider.fetch_daily_bars("AAPL", january()).await.unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "API error (HTTP 404): not found");
    }

    #[test]
    fn symbol_validation() {
        for ok in ["AAPL", "BRK-B", "BRK.B", "^GSPC", "EURUSD=X"] {
            assert!(validate_symbol(ok).is_ok(), "{ok} should be accepted");
        }
        for bad in ["", "AA PL", "../etc", "AAPL?x=1"] {
            assert!(validate_symbol(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        for status in [429u16, 500, 502, 503] {
            let err = ApiSnafu {
                status,
                message: "busy",
            }
            .build();
            assert!(err.is_transient(), "HTTP {status} should be retryable");
        }
        let err = ApiSnafu {
            status: 400u16,
            message: "bad",
        }
        .build();
        assert!(!err.is_transient());
        assert!(!DecodeSnafu { message: "x" }.build().is_transient());
    }

    #[test]
    fn local_and_validation_errors_are_permanent() {
        let validation = validate_symbol("AA PL").unwrap_err();
        assert!(matches!(validation, ProviderError::Validation { .. }));
        assert!(!validation.is_transient());

        let io = std::fs::read("/nonexistent/AAPL.csv")
            .context(IoSnafu {
                path: "/nonexistent/AAPL.csv",
            })
            .unwrap_err();
        assert!(!io.is_transient());
        assert!(io.to_string().starts_with("Failed to read /nonexistent/AAPL.csv"));
    }
}
