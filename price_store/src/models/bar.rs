//! Canonical in-memory representation of a daily price bar and of a
//! per-instrument series of bars.
//!
//! These structs are the standard output for all
//! [`DataProvider`](crate::providers::DataProvider) implementations, regardless
//! of where the prices came from.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single daily price bar.
///
/// The instrument identifier lives on the enclosing [`Series`], so a bar is
/// only meaningful together with the series that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading day (exchange-local calendar date, no time component).
    pub date: NaiveDate,

    /// Opening price.
    pub open: f64,

    /// Highest price during the session.
    pub high: f64,

    /// Lowest price during the session.
    pub low: f64,

    /// Closing price.
    pub close: f64,

    /// Closing price adjusted for splits and dividends.
    pub adj_close: f64,

    /// Shares traded during the session.
    pub volume: u64,
}

impl Bar {
    /// Whether every price on the bar is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.adj_close]
            .iter()
            .all(|p| p.is_finite())
    }
}

/// The price history of one instrument, ordered by date.
///
/// Construction normalizes whatever a provider returned: bars are sorted by
/// date and a repeated date keeps only the last bar seen for it, so dates are
/// strictly increasing. Bars with a non-finite price are dropped.
/// Deserialized series are normalized the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSeries")]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl From<RawSeries> for Series {
    fn from(raw: RawSeries) -> Self {
        Self::new(raw.symbol, raw.bars)
    }
}

impl Series {
    /// Builds a normalized series for `symbol`.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        let symbol = symbol.into();

        let received = bars.len();
        bars.retain(Bar::is_finite);
        let unpriced = received - bars.len();
        if unpriced > 0 {
            warn!(%symbol, unpriced, "dropped bars with non-finite prices");
        }

        // Stable sort keeps provider order among equal dates, so "last wins"
        // below means last as delivered.
        bars.sort_by_key(|b| b.date);

        let before = bars.len();
        let mut normalized: Vec<Bar> = Vec::with_capacity(before);
        for bar in bars {
            match normalized.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => normalized.push(bar),
            }
        }

        let dropped = before - normalized.len();
        if dropped > 0 {
            warn!(%symbol, dropped, "collapsed duplicate bars for repeated dates");
        }

        Self {
            symbol,
            bars: normalized,
        }
    }

    /// Merges two series of the same instrument into one normalized series.
    ///
    /// Where both carry a bar for the same date, the bar from `other` wins.
    pub fn merge(self, other: Series) -> Self {
        let mut bars = self.bars;
        bars.extend(other.bars);
        Self::new(self.symbol, bars)
    }

    /// Instrument identifier (ticker symbol).
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bars in strictly increasing date order.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Adjusted closes in date order.
    pub fn adj_closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.adj_close).collect()
    }

    /// Position of the bar dated exactly `date`, if any.
    pub fn position_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by_key(&date, |b| b.date).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, adj_close: f64) -> Bar {
        Bar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: adj_close,
            high: adj_close,
            low: adj_close,
            close: adj_close,
            adj_close,
            volume: 1_000,
        }
    }

    #[test]
    fn sorts_bars_by_date() {
        let series = Series::new("AAPL", vec![bar(5, 3.0), bar(1, 1.0), bar(4, 2.0)]);
        let days: Vec<u32> = series
            .bars()
            .iter()
            .map(|b| chrono::Datelike::day(&b.date))
            .collect();
        assert_eq!(days, vec![1, 4, 5]);
        assert_eq!(series.adj_closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn repeated_date_keeps_last_bar() {
        let series = Series::new("AAPL", vec![bar(1, 1.0), bar(2, 2.0), bar(1, 9.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.bars()[0].adj_close, 9.0);
    }

    #[test]
    fn non_finite_bars_are_dropped() {
        let mut bad_open = bar(3, 3.0);
        bad_open.open = f64::INFINITY;
        let series = Series::new(
            "TSLA",
            vec![bar(1, 1.0), bar(2, f64::NAN), bad_open, bar(4, 4.0)],
        );
        assert_eq!(series.adj_closes(), vec![1.0, 4.0]);
        assert!(series.bars().iter().all(Bar::is_finite));
    }

    #[test]
    fn deserialized_series_is_normalized() {
        let unsorted = serde_json::json!({
            "symbol": "AAPL",
            "bars": [bar(5, 3.0), bar(1, 1.0), bar(5, 4.0)],
        });
        let series: Series = serde_json::from_value(unsorted).unwrap();
        assert_eq!(series.adj_closes(), vec![1.0, 4.0]);
        assert_eq!(series.position_of(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()), Some(1));
    }

    #[test]
    fn merge_prefers_other_on_overlap() {
        let a = Series::new("MSFT", vec![bar(1, 1.0), bar(2, 2.0)]);
        let b = Series::new("MSFT", vec![bar(2, 20.0), bar(3, 3.0)]);
        let merged = a.merge(b);
        assert_eq!(merged.adj_closes(), vec![1.0, 20.0, 3.0]);
        assert_eq!(merged.symbol(), "MSFT");
    }

    #[test]
    fn position_of_finds_exact_dates_only() {
        let series = Series::new("AAPL", vec![bar(1, 1.0), bar(4, 2.0)]);
        assert_eq!(series.position_of(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()), Some(1));
        assert_eq!(series.position_of(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()), None);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 3, 4));
    }

    proptest::proptest! {
        #[test]
        fn normalized_dates_strictly_increase(days in proptest::collection::vec(1u32..=28, 0..60)) {
            let bars: Vec<Bar> = days.iter().map(|&d| bar(d, d as f64)).collect();
            let series = Series::new("X", bars);

            for pair in series.bars().windows(2) {
                proptest::prop_assert!(pair[0].date < pair[1].date);
            }
            let mut unique = days.clone();
            unique.sort_unstable();
            unique.dedup();
            proptest::prop_assert_eq!(series.len(), unique.len());
        }
    }
}
