use std::path::PathBuf;

use price_store::StoreError;
use thiserror::Error;

/// The unified error type for the `forecast` crate.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The series needed for a prediction could not be fetched.
    #[error(transparent)]
    DataUnavailable(#[from] StoreError),

    /// Training input cannot determine a model.
    #[error("Insufficient training data: {reason}")]
    InsufficientData { reason: String },

    #[error("Failed to access model file {}: {source}", path.display())]
    ModelIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model JSON: {0}")]
    ModelFormat(#[from] serde_json::Error),
}

impl ForecastError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        ForecastError::InsufficientData {
            reason: reason.into(),
        }
    }
}
