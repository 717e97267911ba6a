//! Daily bars from the Yahoo Finance chart endpoint.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::YahooProvider;
pub use response::parse_chart_response;
