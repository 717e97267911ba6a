//! Linear models and the engines that fit them.
//!
//! A [`LinearModel`] maps the feature vector
//! `(adj_close, ma_10, ma_20, ma_50)` to a next-day price. It is plain data:
//! fitted once, then shared read-only or written to JSON and loaded by a later
//! process.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "features": ["adj_close", "ma_10", "ma_20", "ma_50"],
//!   "weights": [0.25, 0.25, 0.25, 0.25],
//!   "bias": 10.625
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::ForecastError,
    features::{FEATURE_NAMES, N_FEATURES},
    linalg::{Matrix, symmetric_eigen},
};

/// Fitted parameters of `price = weights · features + bias`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub weights: [f64; N_FEATURES],
    pub bias: f64,
}

#[derive(Serialize, Deserialize)]
struct LinearModelJson {
    features: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
}

impl LinearModel {
    pub fn predict(&self, features: &[f64; N_FEATURES]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }

    pub fn to_json(&self) -> Result<String, ForecastError> {
        let json = LinearModelJson {
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            weights: self.weights.to_vec(),
            bias: self.bias,
        };
        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Parses a model, rejecting one written for a different feature layout.
    pub fn from_json(json: &str) -> Result<Self, ForecastError> {
        let parsed: LinearModelJson = serde_json::from_str(json)?;

        if parsed.features != FEATURE_NAMES {
            return Err(format_error(format!(
                "expected features {FEATURE_NAMES:?}, got {:?}",
                parsed.features
            )));
        }
        let weights: [f64; N_FEATURES] = parsed.weights.try_into().map_err(|w: Vec<f64>| {
            format_error(format!("expected {N_FEATURES} weights, got {}", w.len()))
        })?;
        if !parsed.bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(format_error("model parameters must be finite"));
        }

        Ok(Self {
            weights,
            bias: parsed.bias,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ForecastError> {
        std::fs::write(path, self.to_json()?).map_err(|source| ForecastError::ModelIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ForecastError> {
        let json = std::fs::read_to_string(path).map_err(|source| ForecastError::ModelIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

fn format_error(message: impl std::fmt::Display) -> ForecastError {
    ForecastError::ModelFormat(<serde_json::Error as serde::de::Error>::custom(message))
}

/// Anything that can fit a [`LinearModel`] to labelled feature rows.
pub trait RegressionEngine: Send + Sync {
    fn fit(
        &self,
        features: &[[f64; N_FEATURES]],
        labels: &[f64],
    ) -> Result<LinearModel, ForecastError>;
}

/// Least squares with an intercept.
///
/// Columns are centered and scaled, then the normal equations are solved
/// through an eigen-decomposition, discarding directions whose eigenvalue is
/// below `rcond` times the largest. Collinear inputs therefore get the
/// minimum-norm solution instead of a singular-matrix failure. Constant
/// columns get weight zero.
#[derive(Debug, Clone, Copy)]
pub struct OrdinaryLeastSquares {
    pub rcond: f64,
}

impl Default for OrdinaryLeastSquares {
    fn default() -> Self {
        Self { rcond: 1e-10 }
    }
}

impl RegressionEngine for OrdinaryLeastSquares {
    fn fit(
        &self,
        features: &[[f64; N_FEATURES]],
        labels: &[f64],
    ) -> Result<LinearModel, ForecastError> {
        if features.is_empty() {
            return Err(ForecastError::insufficient("training set is empty"));
        }
        if features.len() != labels.len() {
            return Err(ForecastError::insufficient(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if labels.iter().chain(features.iter().flatten()).any(|v| !v.is_finite()) {
            return Err(ForecastError::insufficient("non-finite value in training set"));
        }

        let n = features.len() as f64;
        let label_mean = labels.iter().sum::<f64>() / n;

        let mut means = [0.0; N_FEATURES];
        for row in features {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = [0.0; N_FEATURES];
        for row in features {
            for j in 0..N_FEATURES {
                let d = row[j] - means[j];
                scales[j] += d * d / n;
            }
        }
        let mut active = [false; N_FEATURES];
        for j in 0..N_FEATURES {
            scales[j] = scales[j].sqrt();
            active[j] = scales[j] > 1e-12 * means[j].abs().max(1.0);
        }
        if !active.iter().any(|&a| a) {
            return Err(ForecastError::insufficient("every feature column is constant"));
        }

        // Normal equations over standardized columns.
        let mut gram: Matrix<N_FEATURES> = [[0.0; N_FEATURES]; N_FEATURES];
        let mut moment = [0.0; N_FEATURES];
        for (row, &y) in features.iter().zip(labels) {
            let mut z = [0.0; N_FEATURES];
            for j in 0..N_FEATURES {
                if active[j] {
                    z[j] = (row[j] - means[j]) / scales[j];
                }
            }
            for i in 0..N_FEATURES {
                moment[i] += z[i] * (y - label_mean);
                for j in 0..N_FEATURES {
                    gram[i][j] += z[i] * z[j];
                }
            }
        }

        let (values, vectors) = symmetric_eigen(gram);
        let largest = values.iter().cloned().fold(0.0, f64::max);
        let cutoff = self.rcond * largest;

        let mut scaled = [0.0; N_FEATURES];
        let mut rank = 0;
        for (k, &lambda) in values.iter().enumerate() {
            if lambda <= cutoff {
                continue;
            }
            rank += 1;
            let projection: f64 = (0..N_FEATURES).map(|i| vectors[i][k] * moment[i]).sum();
            for (i, b) in scaled.iter_mut().enumerate() {
                *b += vectors[i][k] * projection / lambda;
            }
        }

        let mut weights = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            if active[j] {
                weights[j] = scaled[j] / scales[j];
            }
        }
        let bias = label_mean - weights.iter().zip(&means).map(|(w, m)| w * m).sum::<f64>();

        debug!(rows = features.len(), rank, ?weights, bias, "fitted least squares");
        Ok(LinearModel { weights, bias })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    #[test]
    fn recovers_exact_linear_relation() {
        let truth = LinearModel {
            weights: [0.5, -1.0, 2.0, 0.25],
            bias: 3.0,
        };
        let xs: Vec<[f64; 4]> = (0..40)
            .map(|i| {
                let i = i as f64;
                [i, (i * 0.7).sin() * 10.0, (i * i) % 17.0, (i * 1.3).cos() * 5.0]
            })
            .collect();
        let ys: Vec<f64> = xs.iter().map(|x| truth.predict(x)).collect();

        let model = OrdinaryLeastSquares::default().fit(&xs, &ys).unwrap();
        for (w, t) in model.weights.iter().zip(truth.weights) {
            assert!(close(*w, t, 1e-8), "weight {w} vs {t}");
        }
        assert!(close(model.bias, truth.bias, 1e-8));
    }

    #[test]
    fn collinear_rising_series_fits_exactly() {
        // Features of a steadily rising price are exact shifts of each other.
        let xs: Vec<[f64; 4]> = (0..10)
            .map(|i| {
                let a = 149.0 + i as f64;
                [a, a - 4.5, a - 9.5, a - 24.5]
            })
            .collect();
        let ys: Vec<f64> = xs.iter().map(|x| x[0] + 1.0).collect();

        let model = OrdinaryLeastSquares::default().fit(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(&ys) {
            assert!(close(model.predict(x), *y, 1e-9));
        }
        assert!(close(model.predict(&[159.0, 154.5, 149.5, 134.5]), 160.0, 1e-9));
    }

    #[test]
    fn constant_column_gets_zero_weight() {
        let xs: Vec<[f64; 4]> = (0..20).map(|i| [i as f64, 7.0, 2.0 * i as f64, 1.0]).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x[0] + 1.0).collect();
        let model = OrdinaryLeastSquares::default().fit(&xs, &ys).unwrap();
        assert_eq!(model.weights[1], 0.0);
        assert_eq!(model.weights[3], 0.0);
        assert!(close(model.predict(&[5.0, 7.0, 10.0, 1.0]), 16.0, 1e-9));
    }

    #[test]
    fn degenerate_inputs_are_insufficient() {
        let ols = OrdinaryLeastSquares::default();
        let insufficient = |r: Result<LinearModel, ForecastError>| {
            matches!(r, Err(ForecastError::InsufficientData { .. }))
        };

        assert!(insufficient(ols.fit(&[], &[])));
        assert!(insufficient(ols.fit(&[[1.0; 4]], &[1.0, 2.0])));
        assert!(insufficient(ols.fit(&[[1.0; 4], [2.0; 4]], &[1.0, f64::NAN])));
        assert!(insufficient(ols.fit(&[[5.0; 4], [5.0; 4]], &[5.0, 6.0])));
    }

    #[test]
    fn json_round_trip_and_validation() {
        let model = LinearModel {
            weights: [0.25, 0.25, 0.25, 0.25],
            bias: 10.625,
        };
        let parsed = LinearModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(parsed, model);

        let reordered = r#"{"features":["ma_10","adj_close","ma_20","ma_50"],"weights":[1,1,1,1],"bias":0}"#;
        assert!(matches!(
            LinearModel::from_json(reordered),
            Err(ForecastError::ModelFormat(_))
        ));

        let short = r#"{"features":["adj_close","ma_10","ma_20","ma_50"],"weights":[1,1],"bias":0}"#;
        let err = LinearModel::from_json(short).unwrap_err();
        assert!(err.to_string().contains("expected 4 weights"));
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = LinearModel {
            weights: [1.0, 0.0, -0.5, 0.125],
            bias: -2.0,
        };
        model.save(&path).unwrap();
        assert_eq!(LinearModel::load(&path).unwrap(), model);

        let missing = LinearModel::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ForecastError::ModelIo { .. }));
    }

    proptest! {
        #[test]
        fn features_equal_to_label_are_reproduced(
            values in prop::collection::vec(1.0f64..1_000.0, 2..80)
                .prop_filter("needs two distinct values", |v| v.iter().any(|x| *x != v[0]))
        ) {
            let xs: Vec<[f64; 4]> = values.iter().map(|&v| [v; 4]).collect();
            let model = OrdinaryLeastSquares::default().fit(&xs, &values).unwrap();
            for (x, y) in xs.iter().zip(&values) {
                prop_assert!((model.predict(x) - y).abs() < 1e-6);
            }
        }
    }
}
