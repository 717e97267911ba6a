use futures::future::join_all;
use tracing::{info, warn};

use crate::{
    errors::StoreError,
    models::{bar::Series, date_range::DateRange},
    store::PriceStore,
};

/// One instrument that could not be fetched during a batch.
#[derive(Debug)]
pub struct FetchFailure {
    pub symbol: String,
    pub error: StoreError,
}

/// Partial result of a batch fetch.
///
/// Both lists keep the order in which symbols were requested.
#[derive(Debug, Default)]
pub struct BatchFetch {
    pub series: Vec<Series>,
    pub failures: Vec<FetchFailure>,
}

impl BatchFetch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_symbols(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.symbol.as_str()).collect()
    }
}

impl PriceStore {
    /// Fetches every symbol concurrently and collects what succeeded.
    ///
    /// A failing instrument never aborts the batch: it is logged, recorded in
    /// [`BatchFetch::failures`], and left out of [`BatchFetch::series`].
    pub async fn fetch_all<S: AsRef<str>>(&self, symbols: &[S], range: DateRange) -> BatchFetch {
        let fetches = symbols.iter().map(|symbol| async move {
            let symbol = symbol.as_ref();
            (symbol.to_string(), self.fetch_series(symbol, range).await)
        });

        let mut batch = BatchFetch::default();
        for (symbol, result) in join_all(fetches).await {
            match result {
                Ok(series) => batch.series.push(series),
                Err(error) => {
                    warn!(%symbol, %error, "skipping instrument");
                    batch.failures.push(FetchFailure { symbol, error });
                }
            }
        }

        info!(
            fetched = batch.series.len(),
            failed = batch.failures.len(),
            "batch fetch complete"
        );
        batch
    }
}
