use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::{
    models::{bar::Bar, date_range::DateRange},
    providers::{ApiSnafu, DecodeSnafu, ProviderError},
};

#[derive(Deserialize, Debug)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

#[derive(Deserialize, Debug)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    pub exchange_timezone_name: Option<String>,
    pub gmtoffset: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Deserialize, Debug)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

/// Maps bar timestamps to the exchange's local calendar date.
enum ExchangeClock {
    Named(Tz),
    Offset(FixedOffset),
}

impl ExchangeClock {
    fn from_meta(meta: &ChartMeta) -> Self {
        if let Some(tz) = meta
            .exchange_timezone_name
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
        {
            return Self::Named(tz);
        }
        let offset = meta
            .gmtoffset
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self::Offset(offset)
    }

    fn local_date(&self, ts: i64) -> Option<NaiveDate> {
        let utc = DateTime::from_timestamp(ts, 0)?;
        Some(match self {
            Self::Named(tz) => utc.with_timezone(tz).date_naive(),
            Self::Offset(off) => utc.with_timezone(off).date_naive(),
        })
    }
}

/// The `i`-th value, treating nulls and non-finite numbers alike as missing.
fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Decodes a chart response body into bars inside `range`.
///
/// Rows with any missing price are skipped (halted sessions show up as
/// nulls). Without an adjusted-close array the plain close is used.
pub fn parse_chart_response(body: &str, range: &DateRange) -> Result<Vec<Bar>, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body).map_err(|e| {
        DecodeSnafu {
            message: e.to_string(),
        }
        .build()
    })?;

    if let Some(err) = envelope.chart.error {
        return ApiSnafu {
            status: 200u16,
            message: format!("{}: {}", err.code, err.description),
        }
        .fail();
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let clock = ExchangeClock::from_meta(&result.meta);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose);
    if adjclose.is_none() {
        debug!(symbol = %result.meta.symbol, "no adjusted closes in response, using close");
    }

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(date) = clock.local_date(ts) else {
            continue;
        };
        if !range.contains(date) {
            continue;
        }
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            continue;
        };
        let adj_close = match &adjclose {
            Some(values) => match at(values, i) {
                Some(v) => v,
                None => continue,
            },
            None => close,
        };
        let volume = at(&quote.volume, i).unwrap_or(0.0).max(0.0).round() as u64;

        bars.push(Bar {
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
        });
    }

    Ok(bars)
}
