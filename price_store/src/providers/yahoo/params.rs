use chrono::{Days, NaiveDate, NaiveTime};

use crate::models::date_range::DateRange;

/// Bar interval requested from the chart endpoint. Only daily bars are used.
pub const DAILY_INTERVAL: &str = "1d";

fn midnight_utc(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Builds the query string for a closed date range.
///
/// The endpoint treats `period2` as exclusive, so it is set to midnight after
/// the last requested day.
pub fn construct_params(range: &DateRange) -> Vec<(String, String)> {
    let after_end = range
        .end()
        .checked_add_days(Days::new(1))
        .unwrap_or(range.end());

    vec![
        ("period1".to_string(), midnight_utc(range.start()).to_string()),
        ("period2".to_string(), midnight_utc(after_end).to_string()),
        ("interval".to_string(), DAILY_INTERVAL.to_string()),
        ("events".to_string(), "div|split".to_string()),
        ("includeAdjustedClose".to_string(), "true".to_string()),
    ]
}
