//! The train/predict service behind the command line.

use std::sync::Arc;

use chrono::NaiveDate;
use forecast::{
    Evaluation, ForecastError, OrdinaryLeastSquares, Prediction, TrainedModel, TrainingContext,
    predict_for_date,
};
use price_store::{DataProvider, DateRange, PriceStore};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{config::AppConfig, model_handle::ModelHandle};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown company: {0}")]
    UnknownCompany(String),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

/// What a training run produced.
#[derive(Debug)]
pub struct TrainReport {
    pub trained: Arc<TrainedModel>,
    /// Symbols skipped because their prices could not be fetched.
    pub failed_symbols: Vec<String>,
    pub evaluation: Option<Evaluation>,
}

pub struct Pipeline {
    config: AppConfig,
    store: PriceStore,
    window: DateRange,
    models: ModelHandle,
    // Held while a lazy first training runs, so concurrent callers share it.
    first_training: Mutex<()>,
}

impl Pipeline {
    /// `today` anchors the retrieval window unless the config pins an end date.
    pub fn new(config: AppConfig, provider: Arc<dyn DataProvider>, today: NaiveDate) -> Self {
        let store = PriceStore::new(provider, config.fetch_policy());
        let window = config.retrieval_window(today);
        Self {
            config,
            store,
            window,
            models: ModelHandle::new(),
            first_training: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn window(&self) -> DateRange {
        self.window
    }

    pub fn models(&self) -> &ModelHandle {
        &self.models
    }

    /// Fetches every configured company, fits a model on rows before the
    /// cutoff and installs it. Companies that cannot be fetched are skipped.
    pub async fn train(&self) -> Result<TrainReport, PipelineError> {
        let batch = self.store.fetch_all(&self.config.symbols(), self.window).await;
        let failed_symbols: Vec<String> = batch
            .failed_symbols()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !failed_symbols.is_empty() {
            warn!(?failed_symbols, "training without some companies");
        }

        let context = TrainingContext::new(batch.series, self.config.training.cutoff);
        let trained = context.train(&OrdinaryLeastSquares::default())?;
        let evaluation = trained.evaluate_holdout();
        if let Some(eval) = &evaluation {
            info!(rows = eval.rows, mae = eval.mae, rmse = eval.rmse, "holdout evaluation");
        }

        Ok(TrainReport {
            trained: self.models.install(trained),
            failed_symbols,
            evaluation,
        })
    }

    /// The installed model, training one first if the slot is empty.
    ///
    /// Concurrent callers that find the slot empty wait for a single training
    /// run instead of each starting their own.
    pub async fn model(&self) -> Result<Arc<TrainedModel>, PipelineError> {
        if let Some(current) = self.models.current() {
            return Ok(current);
        }

        let _guard = self.first_training.lock().await;
        if let Some(current) = self.models.current() {
            debug!("model installed while waiting, skipping training");
            return Ok(current);
        }
        Ok(self.train().await?.trained)
    }

    /// Predicts the next-day price of the company named `company` from its
    /// row on `date`.
    pub async fn predict(&self, company: &str, date: NaiveDate) -> Result<Prediction, PipelineError> {
        let symbol = self
            .config
            .company(company)
            .map(|c| c.symbol.clone())
            .ok_or_else(|| PipelineError::UnknownCompany(company.trim().to_string()))?;

        let trained = self.model().await?;
        let prediction =
            predict_for_date(&self.store, &symbol, date, self.window, &trained.model).await?;
        Ok(prediction)
    }

    /// The message shown for `prediction`, using the configured display name.
    pub fn render(&self, prediction: &Prediction) -> String {
        match prediction {
            Prediction::Estimate {
                symbol,
                date,
                price,
                ..
            } => {
                let name = self
                    .config
                    .companies
                    .iter()
                    .find(|c| &c.symbol == symbol)
                    .map_or(symbol.as_str(), |c| c.name.as_str());
                format!("The predicted stock price for {name} on {date} is ${price:.2}")
            }
            Prediction::NoDataForDate { date, .. } => format!("No data available for {date}"),
        }
    }
}
