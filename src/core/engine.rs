use super::error::{AllocationError, Result};
use super::plan::build_plan;
use super::types::{
    Allocation, AssetShare, AssetTemplate, Inputs, PortfolioResult, Projection, ProjectionPoint,
    ProjectionScenario, ReturnAssumption, RiskProfile, Strategy,
};

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;

const AGE_FACTOR_FLOOR: f64 = 0.5;
const EXCESS_TO_BONDS: f64 = 0.7;
const EXCESS_TO_CASH: f64 = 0.3;

pub const PROJECTION_HORIZONS: [u32; 3] = [10, 20, 30];

pub const DEFAULT_RETURN_ASSUMPTIONS: [ReturnAssumption; 2] = [
    ReturnAssumption {
        label: "conservative_6%",
        rate: 0.06,
    },
    ReturnAssumption {
        label: "expected_8%",
        rate: 0.08,
    },
];

pub fn build_portfolio(inputs: &Inputs) -> Result<PortfolioResult> {
    validate_inputs(inputs)?;

    let allocation = compute_allocation(inputs.age, inputs.risk, &inputs.strategy)?;
    let projection = compute_projection(
        inputs.monthly_investment,
        &DEFAULT_RETURN_ASSUMPTIONS,
        &PROJECTION_HORIZONS,
    )?;
    let plan = build_plan(&allocation, inputs.monthly_investment);

    Ok(PortfolioResult {
        allocation,
        projection,
        plan,
    })
}

pub fn validate_inputs(inputs: &Inputs) -> Result<()> {
    validate_age(inputs.age)?;
    validate_amount(inputs.monthly_investment)
}

fn validate_age(age: u32) -> Result<()> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(AllocationError::InvalidAge(i64::from(age)));
    }
    Ok(())
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AllocationError::InvalidAmount(amount));
    }
    Ok(())
}

pub fn risk_multiplier(risk: RiskProfile) -> f64 {
    match risk {
        RiskProfile::Low => 0.8,
        RiskProfile::Moderate => 1.0,
        RiskProfile::High => 1.2,
    }
}

/// Remaining-horizon fraction, `(100 - age) / 100`. Not floored.
pub fn age_factor(age: u32) -> f64 {
    (100.0 - f64::from(age)) / 100.0
}

pub fn age_risk_scalar(age: u32, risk: RiskProfile) -> f64 {
    risk_multiplier(risk) * age_factor(age).max(AGE_FACTOR_FLOOR)
}

pub fn three_bucket_base(risk: RiskProfile) -> [(&'static str, f64); 3] {
    match risk {
        RiskProfile::Low => [("stocks", 40.0), ("bonds", 50.0), ("cash", 10.0)],
        RiskProfile::Moderate => [("stocks", 60.0), ("bonds", 30.0), ("cash", 10.0)],
        RiskProfile::High => [("stocks", 80.0), ("bonds", 15.0), ("cash", 5.0)],
    }
}

pub fn compute_allocation(age: u32, risk: RiskProfile, strategy: &Strategy) -> Result<Allocation> {
    validate_age(age)?;

    let shares = match strategy {
        Strategy::ThreeBucket => three_bucket_allocation(age, risk),
        Strategy::RiskParityTemplate(template) => risk_parity_allocation(age, risk, template),
    };
    Ok(Allocation { shares })
}

fn three_bucket_allocation(age: u32, risk: RiskProfile) -> Vec<AssetShare> {
    let [(_, stocks), (_, bonds), (_, cash)] = three_bucket_base(risk);
    let factor = age_factor(age);
    let excess = stocks * (1.0 - factor);

    vec![
        share("stocks", round_to_tenth(stocks * factor)),
        share("bonds", round_to_tenth(bonds + excess * EXCESS_TO_BONDS)),
        share("cash", round_to_tenth(cash + excess * EXCESS_TO_CASH)),
    ]
}

fn risk_parity_allocation(age: u32, risk: RiskProfile, template: &AssetTemplate) -> Vec<AssetShare> {
    let scalar = age_risk_scalar(age, risk);
    // Rescale by the largest weight first so the scaled total cannot overflow.
    let largest = template
        .weights()
        .iter()
        .map(|w| w.weight)
        .fold(0.0_f64, f64::max);
    let adjusted: Vec<(&str, f64)> = template
        .weights()
        .iter()
        .map(|w| (w.asset.as_str(), w.weight / largest * scalar))
        .collect();
    normalize(&adjusted)
}

/// Rescales weights to percentages of their own total, one decimal place.
pub fn normalize(weights: &[(&str, f64)]) -> Vec<AssetShare> {
    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    weights
        .iter()
        .map(|(asset, weight)| {
            let percent = if total > 0.0 {
                round_to_tenth(weight / total * 100.0)
            } else {
                0.0
            };
            share(asset, percent)
        })
        .collect()
}

pub fn compute_projection(
    monthly_investment: f64,
    assumptions: &[ReturnAssumption],
    horizons: &[u32],
) -> Result<Projection> {
    validate_amount(monthly_investment)?;

    let annual_contribution = monthly_investment * 12.0;
    let mut scenarios = Vec::with_capacity(assumptions.len());
    for assumption in assumptions {
        if !assumption.rate.is_finite() || assumption.rate <= -1.0 {
            return Err(AllocationError::InvalidRate(assumption.rate));
        }
        let mut points = Vec::with_capacity(horizons.len());
        for &years in horizons {
            let value = projected_value(annual_contribution, assumption.rate, years);
            if !value.is_finite() {
                return Err(AllocationError::InvalidAmount(monthly_investment));
            }
            points.push(ProjectionPoint {
                years,
                value: round_to_cents(value),
            });
        }
        scenarios.push(ProjectionScenario {
            label: assumption.label.to_string(),
            annual_rate: assumption.rate,
            points,
        });
    }

    Ok(Projection { scenarios })
}

// Total contributions grown by a single compounding factor; deliberately not an annuity FV.
pub fn projected_value(annual_contribution: f64, rate: f64, years: u32) -> f64 {
    annual_contribution * f64::from(years) * (1.0 + rate).powf(f64::from(years))
}

fn share(asset: &str, percent: f64) -> AssetShare {
    AssetShare {
        asset: asset.to_string(),
        percent,
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
