use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MarketError, NarrativeSource};
use crate::core::MarketAnalysis;

pub const NARRATIVE_PROMPT: &str =
    "Analyze the current stock market trend based on historical performance.";

pub const DEFAULT_MAX_NEW_TOKENS: u32 = 100;

/// Text-generation endpoint that accepts `{"inputs": ...}` and answers
/// `[{"generated_text": ...}]`.
pub struct HttpNarrative {
    client: reqwest::Client,
    endpoint: String,
    max_new_tokens: u32,
}

impl HttpNarrative {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, MarketError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
        })
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = max_new_tokens;
        self
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    do_sample: bool,
}

#[derive(Deserialize)]
struct Generated {
    generated_text: String,
}

pub fn build_prompt(market: Option<&MarketAnalysis>) -> String {
    match market {
        Some(market) => format!(
            "{NARRATIVE_PROMPT} The market trend is {} with annualized volatility of {:.1}%.",
            market.trend.label().to_lowercase(),
            market.volatility_percent
        ),
        None => NARRATIVE_PROMPT.to_string(),
    }
}

#[async_trait]
impl NarrativeSource for HttpNarrative {
    async fn describe(&self, market: Option<&MarketAnalysis>) -> Result<String, MarketError> {
        let prompt = build_prompt(market);
        debug!(endpoint = %self.endpoint, "requesting market commentary");

        let generated: Vec<Generated> = self
            .client
            .post(&self.endpoint)
            .json(&GenerationRequest {
                inputs: &prompt,
                parameters: GenerationParameters {
                    max_new_tokens: self.max_new_tokens,
                    do_sample: true,
                },
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        generated
            .into_iter()
            .map(|g| g.generated_text.trim().to_string())
            .find(|text| !text.is_empty())
            .ok_or(MarketError::EmptyNarrative)
    }
}
