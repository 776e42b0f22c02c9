use thiserror::Error;

pub type Result<T> = std::result::Result<T, AllocationError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AllocationError {
    #[error("age must be between 18 and 100, got {0}")]
    InvalidAge(i64),

    #[error("invalid risk tolerance '{0}'; choose from Low, Moderate, or High")]
    InvalidRiskProfile(String),

    #[error("monthly investment must be a positive amount, got {0}")]
    InvalidAmount(f64),

    #[error("annual return rate must be finite and above -100%, got {0}")]
    InvalidRate(f64),

    #[error("invalid asset template: {0}")]
    InvalidTemplate(String),
}

impl AllocationError {
    pub fn kind(&self) -> &'static str {
        match self {
            AllocationError::InvalidAge(_) => "invalid_age",
            AllocationError::InvalidRiskProfile(_) => "invalid_risk_profile",
            AllocationError::InvalidAmount(_) => "invalid_amount",
            AllocationError::InvalidRate(_) => "invalid_rate",
            AllocationError::InvalidTemplate(_) => "invalid_template",
        }
    }
}
