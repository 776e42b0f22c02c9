mod engine;
mod error;
mod plan;
mod report;
mod types;

pub use engine::{
    DEFAULT_RETURN_ASSUMPTIONS, MAX_AGE, MIN_AGE, PROJECTION_HORIZONS, age_factor,
    age_risk_scalar, build_portfolio, compute_allocation, compute_projection, normalize,
    projected_value, risk_multiplier, three_bucket_base, validate_inputs,
};
pub use error::{AllocationError, Result};
pub use plan::{
    AssetContribution, DRIFT_THRESHOLD_PERCENT, FundPick, ImplementationPlan, REBALANCE_CADENCE,
    build_plan, recommended_funds,
};
pub use report::{PortfolioReport, display_name, format_currency};
pub use types::{
    Allocation, AssetShare, AssetTemplate, BaseWeight, Inputs, MarketAnalysis, MarketTrend,
    PortfolioResult, Projection, ProjectionPoint, ProjectionScenario, ReturnAssumption,
    RiskProfile, Strategy,
};
