use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{MarketDataSource, MarketError};

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// One month of daily closes from the Yahoo chart endpoint.
pub struct YahooChartSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("allweather/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<f64>, MarketError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!(%url, "fetching price history");

        let envelope: ChartEnvelope = self
            .client
            .get(&url)
            .query(&[("range", "1mo"), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Yahoo reports non-trading days as null closes.
        envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .and_then(|result| result.indicators.quote.into_iter().next())
            .map(|quote| quote.close.into_iter().flatten().collect())
            .ok_or_else(|| MarketError::MissingSeries {
                symbol: symbol.to_string(),
            })
    }
}
