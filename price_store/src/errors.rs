use std::time::Duration;

use thiserror::Error;

use crate::providers::ProviderError;

/// Why a series could not be produced.
#[derive(Debug, Error)]
pub enum Unavailable {
    /// The provider failed (after any retries it qualified for).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider answered but had no bars in range.
    #[error("source returned no rows")]
    NoRows,

    /// Every attempt ran past the per-attempt timeout.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// The unified error type for the `price_store` crate.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The series of one instrument could not be fetched.
    #[error("Data unavailable for {symbol}: {cause}")]
    DataUnavailable {
        symbol: String,
        #[source]
        cause: Unavailable,
    },
}

impl StoreError {
    pub fn unavailable(symbol: impl Into<String>, cause: impl Into<Unavailable>) -> Self {
        StoreError::DataUnavailable {
            symbol: symbol.into(),
            cause: cause.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            StoreError::DataUnavailable { symbol, .. } => symbol,
        }
    }
}
