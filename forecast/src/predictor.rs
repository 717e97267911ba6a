//! Next-day estimate for one instrument on one date.

use chrono::NaiveDate;
use price_store::{DateRange, PriceStore, Series};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    errors::ForecastError,
    features::{N_FEATURES, moving_averages},
    regression::LinearModel,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Estimate {
        symbol: String,
        date: NaiveDate,
        price: f64,
        features: [f64; N_FEATURES],
    },
    /// No trading day on `date`, or too little history before it.
    NoDataForDate { symbol: String, date: NaiveDate },
}

impl Prediction {
    pub fn price(&self) -> Option<f64> {
        match self {
            Prediction::Estimate { price, .. } => Some(*price),
            Prediction::NoDataForDate { .. } => None,
        }
    }
}

/// Applies `model` to the row of `series` dated `date`.
pub fn predict_from_series(series: &Series, date: NaiveDate, model: &LinearModel) -> Prediction {
    let no_data = || Prediction::NoDataForDate {
        symbol: series.symbol().to_string(),
        date,
    };

    let Some(position) = series.position_of(date) else {
        debug!(symbol = %series.symbol(), %date, "no bar on requested date");
        return no_data();
    };

    let Some(features) = moving_averages(series)
        .get(position)
        .and_then(|row| row.features())
    else {
        debug!(symbol = %series.symbol(), %date, "not enough history for moving averages");
        return no_data();
    };

    Prediction::Estimate {
        symbol: series.symbol().to_string(),
        date,
        price: model.predict(&features),
        features,
    }
}

/// Fetches `symbol` over `window` and predicts from its row on `date`.
///
/// A date outside `window` can never have a row and is answered without a
/// fetch. Fetch failures are returned as errors.
pub async fn predict_for_date(
    store: &PriceStore,
    symbol: &str,
    date: NaiveDate,
    window: DateRange,
    model: &LinearModel,
) -> Result<Prediction, ForecastError> {
    if !window.contains(date) {
        debug!(%symbol, %date, "requested date outside retrieval window");
        return Ok(Prediction::NoDataForDate {
            symbol: symbol.to_string(),
            date,
        });
    }

    let series = store.fetch_series(symbol, window).await?;
    let prediction = predict_from_series(&series, date, model);
    if let Some(price) = prediction.price() {
        info!(%symbol, %date, price, "prediction made");
    }
    Ok(prediction)
}
