//! Daily bars from a directory of downloaded CSV files.
//!
//! Each instrument lives in `<dir>/<SYMBOL>.csv` with the header
//! `Date,Open,High,Low,Close,Adj Close,Volume`, the layout the common
//! "download historical data" buttons produce. Rows holding `null`, `NaN` or
//! infinite prices are skipped. A file without an `Adj Close` column falls back to `Close`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use snafu::ResultExt;

use crate::{
    models::{bar::Bar, date_range::DateRange},
    providers::{CsvSnafu, DataProvider, IoSnafu, ProviderError, validate_symbol},
};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open", deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(rename = "High", deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(rename = "Low", deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    #[serde(rename = "Close", deserialize_with = "csv::invalid_option")]
    close: Option<f64>,
    #[serde(rename = "Adj Close", default, deserialize_with = "csv::invalid_option")]
    adj_close: Option<f64>,
    #[serde(rename = "Volume", default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
}

impl CsvRow {
    fn into_bar(self) -> Option<Bar> {
        let close = self.close?;
        let bar = Bar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close,
            adj_close: self.adj_close.unwrap_or(close),
            volume: self.volume.unwrap_or(0.0).max(0.0).round() as u64,
        };
        bar.is_finite().then_some(bar)
    }
}

pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }
}

/// Parses CSV bytes, keeping rows dated inside `range`.
pub fn parse_price_csv(
    bytes: &[u8],
    path: &Path,
    range: &DateRange,
) -> Result<Vec<Bar>, ProviderError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);

    let mut bars = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        let row = row.context(CsvSnafu { path })?;
        if !range.contains(row.date) {
            continue;
        }
        if let Some(bar) = row.into_bar() {
            bars.push(bar);
        }
    }
    Ok(bars)
}

#[async_trait]
impl DataProvider for CsvProvider {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Bar>, ProviderError> {
        validate_symbol(symbol)?;

        let path = self.path_for(symbol);
        let bytes = tokio::fs::read(&path).await.context(IoSnafu { path: &path })?;
        parse_price_csv(&bytes, &path, &range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-02,187.15,188.44,183.89,185.64,184.29,82488700
2024-01-03,null,null,null,null,null,null
2024-01-04,182.15,183.09,180.88,181.91,180.59,71983600
2024-02-01,183.99,186.95,183.82,186.86,185.50,64885400
";

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn parses_rows_and_skips_nulls() {
        let bars = parse_price_csv(SAMPLE.as_bytes(), Path::new("AAPL.csv"), &january()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].adj_close, 184.29);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(bars[1].volume, 71_983_600);
    }

    #[test]
    fn non_finite_prices_are_skipped_like_nulls() {
        let csv = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-02,1,1,1,1,1,100
2024-01-03,2,2,2,2,NaN,100
2024-01-04,inf,3,3,3,3,100
2024-01-05,4,4,4,4,4,100
";
        let bars = parse_price_csv(csv.as_bytes(), Path::new("TSLA.csv"), &january()).unwrap();
        let closes: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();
        assert_eq!(closes, vec![1.0, 4.0]);
    }

    #[test]
    fn missing_adj_close_column_uses_close() {
        let csv = "Date,Open,High,Low,Close,Volume\n2024-01-02,1,2,0.5,1.5,100\n";
        let bars = parse_price_csv(csv.as_bytes(), Path::new("X.csv"), &january()).unwrap();
        assert_eq!(bars[0].adj_close, 1.5);
    }

    #[test]
    fn bad_date_is_a_csv_error() {
        let csv = "Date,Open,High,Low,Close,Adj Close,Volume\nyesterday,1,1,1,1,1,1\n";
        let err = parse_price_csv(csv.as_bytes(), Path::new("X.csv"), &january()).unwrap_err();
        assert!(matches!(err, ProviderError::Csv { .. }));
        assert!(err.to_string().contains("X.csv"));
    }

    #[tokio::test]
    async fn reads_symbol_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("AAPL.csv"), SAMPLE).unwrap();
        let provider = CsvProvider::new(dir.path());

        let bars = provider.fetch_daily_bars("AAPL", january()).await.unwrap();
        assert_eq!(bars.len(), 2);

        let err = provider.fetch_daily_bars("MSFT", january()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Io { .. }));
        assert!(!err.is_transient());
    }
}
