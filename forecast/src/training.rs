use chrono::NaiveDate;
use price_store::Series;
use tracing::info;

use crate::{
    errors::ForecastError,
    evaluation::{Evaluation, evaluate},
    features::build_dataset,
    regression::{LinearModel, RegressionEngine},
    split::{Split, split_by_date},
};

/// Everything a training run reads, gathered up front.
#[derive(Debug, Clone)]
pub struct TrainingContext {
    pub series: Vec<Series>,
    /// First date of the testing subset.
    pub cutoff: NaiveDate,
}

/// A fitted model together with the data split it was fitted on.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LinearModel,
    pub split: Split,
}

impl TrainedModel {
    /// Scores the model on the rows held out for testing.
    pub fn evaluate_holdout(&self) -> Option<Evaluation> {
        evaluate(&self.model, &self.split.testing)
    }
}

impl TrainingContext {
    pub fn new(series: Vec<Series>, cutoff: NaiveDate) -> Self {
        Self { series, cutoff }
    }

    /// Builds the dataset, splits it at the cutoff and fits `engine` on the
    /// training half.
    ///
    /// Errors:
    /// - [`ForecastError::InsufficientData`] if no row falls before the cutoff
    ///   or the engine rejects the training rows.
    pub fn train(&self, engine: &dyn RegressionEngine) -> Result<TrainedModel, ForecastError> {
        let dataset = build_dataset(&self.series);
        let total = dataset.len();
        let split = split_by_date(dataset, self.cutoff);

        info!(
            instruments = self.series.len(),
            rows = total,
            training = split.training.len(),
            testing = split.testing.len(),
            cutoff = %self.cutoff,
            "built dataset"
        );

        if split.training.is_empty() {
            return Err(ForecastError::insufficient(format!(
                "no complete rows dated before {}",
                self.cutoff
            )));
        }

        let (features, labels) = split.training_xy();
        let model = engine.fit(&features, &labels)?;
        info!(weights = ?model.weights, bias = model.bias, "model fitted");

        Ok(TrainedModel { model, split })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;
    use price_store::Bar;

    use super::*;
    use crate::regression::OrdinaryLeastSquares;

    fn rising(symbol: &str, days: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2022, 10, 1).unwrap();
        let bars = (0..days)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar {
                    date: start + Days::new(i as u64),
                    open: c,
                    high: c,
                    low: c,
                    close: c,
                    adj_close: c,
                    volume: 1,
                }
            })
            .collect();
        Series::new(symbol, bars)
    }

    #[test]
    fn keeps_testing_rows_for_evaluation() {
        let series = rising("AAPL", 120);
        // Rows exist for days 49..=118; split them roughly in half.
        let cutoff = NaiveDate::from_ymd_opt(2022, 10, 1).unwrap() + Days::new(90);
        let trained = TrainingContext::new(vec![series], cutoff)
            .train(&OrdinaryLeastSquares::default())
            .unwrap();

        assert_eq!(trained.split.training.len(), 41);
        assert_eq!(trained.split.testing.len(), 29);

        let eval = trained.evaluate_holdout().unwrap();
        assert_eq!(eval.rows, 29);
        assert!(eval.mae < 1e-6);
    }

    #[test]
    fn cutoff_before_any_row_is_insufficient() {
        let ctx = TrainingContext::new(
            vec![rising("AAPL", 80)],
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
        );
        let err = ctx.train(&OrdinaryLeastSquares::default()).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { .. }));
    }

    #[test]
    fn no_series_is_insufficient() {
        let ctx = TrainingContext::new(vec![], NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert!(matches!(
            ctx.train(&OrdinaryLeastSquares::default()),
            Err(ForecastError::InsufficientData { .. })
        ));
    }
}
