use serde::Serialize;

use super::engine::round_to_cents;
use super::types::Allocation;

pub const DRIFT_THRESHOLD_PERCENT: f64 = 5.0;
pub const REBALANCE_CADENCE: &str = "quarterly";

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundPick {
    pub ticker: &'static str,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetContribution {
    pub asset: String,
    pub percent: f64,
    pub monthly_amount: f64,
    pub funds: Vec<FundPick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationPlan {
    pub contributions: Vec<AssetContribution>,
    pub rebalancing: &'static str,
    pub drift_threshold_percent: f64,
}

impl ImplementationPlan {
    pub fn total_monthly(&self) -> f64 {
        self.contributions.iter().map(|c| c.monthly_amount).sum()
    }
}

const fn pick(ticker: &'static str, weight_percent: f64) -> FundPick {
    FundPick {
        ticker,
        weight_percent,
    }
}

/// Recommended funds for a known asset class; empty for custom classes.
pub fn recommended_funds(asset: &str) -> Vec<FundPick> {
    match asset {
        "stocks" => vec![pick("VTI", 70.0), pick("VXUS", 30.0)],
        "bonds" => vec![pick("BND", 80.0), pick("BNDX", 20.0)],
        "cash" => vec![pick("VMFXX", 100.0)],
        "us_stocks" => vec![pick("VTI", 100.0)],
        "international_stocks" => vec![pick("VXUS", 100.0)],
        "long_term_bonds" => vec![pick("TLT", 100.0)],
        "intermediate_bonds" => vec![pick("IEF", 100.0)],
        "inflation_protected" => vec![pick("SCHP", 100.0)],
        "gold" => vec![pick("IAU", 100.0)],
        "commodities" => vec![pick("DBC", 100.0)],
        _ => Vec::new(),
    }
}

pub fn build_plan(allocation: &Allocation, monthly_investment: f64) -> ImplementationPlan {
    let contributions = allocation
        .iter()
        .map(|share| AssetContribution {
            asset: share.asset.clone(),
            percent: share.percent,
            monthly_amount: round_to_cents(monthly_investment * share.percent / 100.0),
            funds: recommended_funds(&share.asset),
        })
        .collect();

    ImplementationPlan {
        contributions,
        rebalancing: REBALANCE_CADENCE,
        drift_threshold_percent: DRIFT_THRESHOLD_PERCENT,
    }
}
