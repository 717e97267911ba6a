//! Accuracy of a model over a held-out subset.

use serde::Serialize;

use crate::{features::FeatureRow, regression::LinearModel};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub rows: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Coefficient of determination; `None` when every label is the same.
    pub r_squared: Option<f64>,
}

/// Scores `model` on `rows`. An empty subset has no score.
pub fn evaluate(model: &LinearModel, rows: &[FeatureRow]) -> Option<Evaluation> {
    if rows.is_empty() {
        return None;
    }

    let n = rows.len() as f64;
    let mean = rows.iter().map(|r| r.label).sum::<f64>() / n;

    let (mut abs_sum, mut sq_sum, mut total) = (0.0, 0.0, 0.0);
    for row in rows {
        let residual = row.label - model.predict(&row.features());
        abs_sum += residual.abs();
        sq_sum += residual * residual;
        total += (row.label - mean).powi(2);
    }

    Some(Evaluation {
        rows: rows.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        r_squared: (total > 0.0).then(|| 1.0 - sq_sum / total),
    })
}
