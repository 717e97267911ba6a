//! Moving-average features and next-day labels.
//!
//! Every windowed value is computed over one instrument at a time. Input
//! series are grouped by symbol first, so rows of different instruments never
//! share a window even when the caller passes them interleaved.

use chrono::NaiveDate;
use indexmap::IndexMap;
use price_store::{Bar, Series};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Moving-average windows, in trading days.
pub const MA_WINDOWS: [usize; 3] = [10, 20, 50];

/// Number of model inputs: adjusted close plus one value per window.
pub const N_FEATURES: usize = 1 + MA_WINDOWS.len();

/// Column names of the feature vector, in order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = ["adj_close", "ma_10", "ma_20", "ma_50"];

/// Simple moving average of `values` over a trailing `window`.
///
/// Entry `i` is the mean of `values[i + 1 - window..=i]`, or `None` while the
/// window is not full (the first `window - 1` entries) or while it holds a
/// non-finite value. A zero window yields no values.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    // The sum only ever holds finite values; `bad` counts the non-finite ones
    // currently inside the window.
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut bad = 0usize;
    for (i, &value) in values.iter().enumerate() {
        if value.is_finite() {
            sum += value;
        } else {
            bad += 1;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_finite() {
                sum -= leaving;
            } else {
                bad -= 1;
            }
        }
        out.push((i + 1 >= window && bad == 0).then(|| sum / window as f64));
    }
    out
}

/// One trading day of an instrument with its moving averages, before any row
/// is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageRow {
    pub date: NaiveDate,
    pub adj_close: f64,
    /// One entry per [`MA_WINDOWS`] window.
    pub averages: [Option<f64>; MA_WINDOWS.len()],
}

impl MovingAverageRow {
    /// The model input for this day, once every window is full.
    pub fn features(&self) -> Option<[f64; N_FEATURES]> {
        let [ma_10, ma_20, ma_50] = self.averages;
        Some([self.adj_close, ma_10?, ma_20?, ma_50?])
    }
}

/// Moving averages over every bar of `series`; no label, nothing dropped.
pub fn moving_averages(series: &Series) -> Vec<MovingAverageRow> {
    let closes = series.adj_closes();
    let columns: Vec<Vec<Option<f64>>> = MA_WINDOWS
        .iter()
        .map(|&window| rolling_mean(&closes, window))
        .collect();

    series
        .bars()
        .iter()
        .enumerate()
        .map(|(i, bar)| MovingAverageRow {
            date: bar.date,
            adj_close: bar.adj_close,
            averages: [columns[0][i], columns[1][i], columns[2][i]],
        })
        .collect()
}

/// A complete engineered row of the combined dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub symbol: String,
    pub date: NaiveDate,
    pub adj_close: f64,
    pub ma_10: f64,
    pub ma_20: f64,
    pub ma_50: f64,
    /// Adjusted close of the next trading day of the same instrument.
    pub label: f64,
}

impl FeatureRow {
    pub fn features(&self) -> [f64; N_FEATURES] {
        [self.adj_close, self.ma_10, self.ma_20, self.ma_50]
    }
}

fn instrument_rows(series: &Series) -> Vec<FeatureRow> {
    let averaged = moving_averages(series);
    averaged
        .iter()
        .zip(averaged.iter().skip(1))
        .filter_map(|(row, next)| {
            let [adj_close, ma_10, ma_20, ma_50] = row.features()?;
            Some(FeatureRow {
                symbol: series.symbol().to_string(),
                date: row.date,
                adj_close,
                ma_10,
                ma_20,
                ma_50,
                label: next.adj_close,
            })
        })
        .collect()
}

/// Builds the combined dataset from any number of series.
///
/// Series sharing a symbol are merged (a later series wins on a repeated
/// date). Instruments appear in first-seen order, rows chronologically within
/// each. Rows without a full set of averages, and each instrument's last row
/// (no next day), are dropped.
pub fn build_dataset(series: &[Series]) -> Vec<FeatureRow> {
    let mut grouped: IndexMap<&str, Vec<Bar>> = IndexMap::new();
    for s in series {
        grouped
            .entry(s.symbol())
            .or_default()
            .extend(s.bars().iter().cloned());
    }

    let mut rows = Vec::new();
    for (symbol, bars) in grouped {
        let instrument = Series::new(symbol, bars);
        let before = rows.len();
        rows.extend(instrument_rows(&instrument));
        debug!(
            %symbol,
            bars = instrument.len(),
            rows = rows.len() - before,
            "engineered instrument"
        );
    }
    rows
}
