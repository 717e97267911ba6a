use async_trait::async_trait;
use reqwest::{Client, header};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{bar::Bar, date_range::DateRange},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, InvalidHeaderSnafu, ProviderError,
        ProviderInitError, ReqwestSnafu, validate_symbol,
        yahoo::{
            params::construct_params,
            response::parse_chart_response,
        },
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// The endpoint throttles requests that carry no browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stock-predictor/0.1";

pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl YahooProvider {
    /// Creates a provider pointed at the public chart endpoint.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a provider pointed at another chart endpoint (a mirror or a
    /// local stub). `{base_url}/{symbol}` must serve the chart JSON.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(USER_AGENT).context(InvalidHeaderSnafu)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    async fn fetch_daily_bars(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<Vec<Bar>, ProviderError> {
        validate_symbol(symbol)?;

        let url = format!("{}/{}", self.base_url, symbol);
        let response = self
            .client
            .get(&url)
            .query(&construct_params(&range))
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;
        if !status.is_success() {
            return ApiSnafu {
                status: status.as_u16(),
                message: body,
            }
            .fail();
        }

        let bars = parse_chart_response(&body, &range)?;
        debug!(%symbol, bars = bars.len(), "fetched chart");
        Ok(bars)
    }
}
