//! Feature engineering, fitting and single-row inference for next-day price
//! estimates.
//!
//! The pipeline runs in two independent directions over the same
//! [`price_store`] series:
//! - training: [`build_dataset`] → [`split_by_date`] → [`RegressionEngine::fit`],
//!   bundled by [`TrainingContext::train`];
//! - inference: [`moving_averages`] over one instrument → [`predict_from_series`].

pub mod errors;
pub mod evaluation;
pub mod features;
mod linalg;
pub mod predictor;
pub mod regression;
pub mod split;
pub mod training;

pub use errors::ForecastError;
pub use evaluation::{Evaluation, evaluate};
pub use features::{
    FEATURE_NAMES, FeatureRow, MA_WINDOWS, MovingAverageRow, N_FEATURES, build_dataset,
    moving_averages, rolling_mean,
};
pub use predictor::{Prediction, predict_for_date, predict_from_series};
pub use regression::{LinearModel, OrdinaryLeastSquares, RegressionEngine};
pub use split::{Split, split_by_date};
pub use training::{TrainedModel, TrainingContext};
