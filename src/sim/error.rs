use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("configuration inconsistency: {0}")]
    ConfigurationInconsistency(String),

    #[error("unknown {what} value {value}")]
    UnknownEnumerationValue { what: &'static str, value: u32 },

    #[error("invalid parameter for {unit}: {reason}")]
    InvalidParameter { unit: String, reason: String },

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EstimateError {
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        EstimateError::ConfigurationInconsistency(msg.into())
    }

    pub fn invalid(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::InvalidParameter {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}
