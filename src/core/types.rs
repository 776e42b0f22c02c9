use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::AllocationError;
use super::plan::ImplementationPlan;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum RiskProfile {
    Low,
    Moderate,
    High,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [RiskProfile::Low, RiskProfile::Moderate, RiskProfile::High];

    pub fn label(self) -> &'static str {
        match self {
            RiskProfile::Low => "Low",
            RiskProfile::Moderate => "Moderate",
            RiskProfile::High => "High",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskProfile {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        RiskProfile::ALL
            .into_iter()
            .find(|risk| risk.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| AllocationError::InvalidRiskProfile(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseWeight {
    pub asset: String,
    pub weight: f64,
}

/// Unadjusted target mix for a strategy. Weights need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTemplate {
    name: String,
    weights: Vec<BaseWeight>,
}

impl AssetTemplate {
    pub fn new<I, S>(name: impl Into<String>, weights: I) -> Result<Self, AllocationError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let weights: Vec<BaseWeight> = weights
            .into_iter()
            .map(|(asset, weight)| BaseWeight {
                asset: asset.into(),
                weight,
            })
            .collect();

        if weights.is_empty() {
            return Err(AllocationError::InvalidTemplate(
                "template needs at least one asset class".to_string(),
            ));
        }

        for (idx, entry) in weights.iter().enumerate() {
            if entry.asset.trim().is_empty() {
                return Err(AllocationError::InvalidTemplate(
                    "asset class names must not be empty".to_string(),
                ));
            }
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(AllocationError::InvalidTemplate(format!(
                    "weight for '{}' must be a non-negative number",
                    entry.asset
                )));
            }
            if weights[..idx].iter().any(|prev| prev.asset == entry.asset) {
                return Err(AllocationError::InvalidTemplate(format!(
                    "asset class '{}' appears more than once",
                    entry.asset
                )));
            }
        }

        let total: f64 = weights.iter().map(|w| w.weight).sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(AllocationError::InvalidTemplate(
                "base weights must have a positive, finite total".to_string(),
            ));
        }

        Ok(Self {
            name: name.into(),
            weights,
        })
    }

    /// Seven-class risk-parity mix. Totals 95, so it only makes sense after normalization.
    pub fn all_weather() -> Self {
        Self {
            name: "all-weather".to_string(),
            weights: [
                ("us_stocks", 20.0),
                ("international_stocks", 10.0),
                ("long_term_bonds", 30.0),
                ("intermediate_bonds", 15.0),
                ("inflation_protected", 5.0),
                ("gold", 7.5),
                ("commodities", 7.5),
            ]
            .into_iter()
            .map(|(asset, weight)| BaseWeight {
                asset: asset.to_string(),
                weight,
            })
            .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &[BaseWeight] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().map(|w| w.weight).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Stocks/bonds/cash split; age-driven excess stock weight moves 70/30 into bonds/cash.
    ThreeBucket,
    /// Template weights scaled by the age-risk scalar and renormalized to 100.
    RiskParityTemplate(AssetTemplate),
}

impl Strategy {
    pub fn risk_parity() -> Self {
        Strategy::RiskParityTemplate(AssetTemplate::all_weather())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ThreeBucket => "three-bucket",
            Strategy::RiskParityTemplate(_) => "risk-parity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetShare {
    pub asset: String,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Allocation {
    pub shares: Vec<AssetShare>,
}

impl Allocation {
    pub fn total(&self) -> f64 {
        self.shares.iter().map(|s| s.percent).sum()
    }

    pub fn percent_of(&self, asset: &str) -> Option<f64> {
        self.shares
            .iter()
            .find(|s| s.asset == asset)
            .map(|s| s.percent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetShare> {
        self.shares.iter()
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnAssumption {
    pub label: &'static str,
    pub rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    pub years: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionScenario {
    pub label: String,
    pub annual_rate: f64,
    pub points: Vec<ProjectionPoint>,
}

impl ProjectionScenario {
    pub fn value_at(&self, years: u32) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.years == years)
            .map(|p| p.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Projection {
    pub scenarios: Vec<ProjectionScenario>,
}

impl Projection {
    pub fn scenario(&self, label: &str) -> Option<&ProjectionScenario> {
        self.scenarios.iter().find(|s| s.label == label)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketTrend {
    Bullish,
    Bearish,
    Neutral,
}

impl MarketTrend {
    pub fn label(self) -> &'static str {
        match self {
            MarketTrend::Bullish => "Bullish",
            MarketTrend::Bearish => "Bearish",
            MarketTrend::Neutral => "Neutral",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketAnalysis {
    pub volatility_percent: f64,
    pub trend: MarketTrend,
}

impl MarketAnalysis {
    pub fn volatility_level(&self) -> &'static str {
        if self.volatility_percent < 15.0 {
            "Low"
        } else if self.volatility_percent < 25.0 {
            "Moderate"
        } else {
            "High"
        }
    }

    pub fn outlook(&self) -> &'static str {
        match self.trend {
            MarketTrend::Bullish => "Favorable for gradual entry",
            MarketTrend::Bearish | MarketTrend::Neutral => "Good time for dollar-cost averaging",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inputs {
    pub age: u32,
    pub risk: RiskProfile,
    pub monthly_investment: f64,
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioResult {
    pub allocation: Allocation,
    pub projection: Projection,
    pub plan: ImplementationPlan,
}
