//! Optional market-data and commentary collaborators.
//!
//! Nothing in `core` depends on these: a failed fetch is logged and the
//! report is built without the market section.

mod narrative;
mod yahoo;

pub use narrative::{DEFAULT_MAX_NEW_TOKENS, HttpNarrative, NARRATIVE_PROMPT, build_prompt};
pub use yahoo::{DEFAULT_YAHOO_BASE_URL, YahooChartSource};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::{MarketAnalysis, MarketTrend};

pub const DEFAULT_MARKET_SYMBOL: &str = "SPY";

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const MIN_CLOSES: usize = 3;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("market request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("need at least {required} closing prices, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("no price series returned for {symbol}")]
    MissingSeries { symbol: String },

    #[error("narrative service returned no text")]
    EmptyNarrative,
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<f64>, MarketError>;
}

#[async_trait]
pub trait NarrativeSource: Send + Sync {
    async fn describe(&self, market: Option<&MarketAnalysis>) -> Result<String, MarketError>;
}

/// Annualized volatility of daily simple returns, plus first-vs-last trend.
pub fn analyze_closes(closes: &[f64]) -> Result<MarketAnalysis, MarketError> {
    let closes: Vec<f64> = closes
        .iter()
        .copied()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect();
    if closes.len() < MIN_CLOSES {
        return Err(MarketError::InsufficientData {
            required: MIN_CLOSES,
            available: closes.len(),
        });
    }

    let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let volatility_percent = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    let first = closes[0];
    let last = closes[closes.len() - 1];
    let trend = if last > first {
        MarketTrend::Bullish
    } else if last < first {
        MarketTrend::Bearish
    } else {
        MarketTrend::Neutral
    };

    Ok(MarketAnalysis {
        volatility_percent,
        trend,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub market: Option<MarketAnalysis>,
    pub narrative: Option<String>,
}

pub struct Collaborators {
    market: Option<Box<dyn MarketDataSource>>,
    narrative: Option<Box<dyn NarrativeSource>>,
    symbol: String,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl Collaborators {
    pub fn new() -> Self {
        Self {
            market: None,
            narrative: None,
            symbol: DEFAULT_MARKET_SYMBOL.to_string(),
        }
    }

    pub fn with_market(mut self, source: impl MarketDataSource + 'static) -> Self {
        self.market = Some(Box::new(source));
        self
    }

    pub fn with_narrative(mut self, source: impl NarrativeSource + 'static) -> Self {
        self.narrative = Some(Box::new(source));
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Never fails; collaborator errors are logged and dropped.
    pub async fn gather(&self) -> Enrichment {
        let market = match &self.market {
            Some(source) => {
                let analysis = source
                    .fetch_closes(&self.symbol)
                    .await
                    .and_then(|closes| analyze_closes(&closes));
                match analysis {
                    Ok(analysis) => {
                        debug!(
                            symbol = %self.symbol,
                            volatility = analysis.volatility_percent,
                            trend = analysis.trend.label(),
                            "market analysis ready"
                        );
                        Some(analysis)
                    }
                    Err(e) => {
                        warn!(symbol = %self.symbol, error = %e, "market analysis unavailable");
                        None
                    }
                }
            }
            None => None,
        };

        let narrative = match &self.narrative {
            Some(source) => match source.describe(market.as_ref()).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(error = %e, "market commentary unavailable");
                    None
                }
            },
            None => None,
        };

        Enrichment { market, narrative }
    }
}
