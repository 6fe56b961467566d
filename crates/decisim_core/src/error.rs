use thiserror::Error;

/// Boxed error returned by a caller-supplied outcome function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the simulation engine.
///
/// Everything except [`SimulationError::OutcomeFunction`] is detected before
/// any sampling starts.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Malformed distribution parameters or an out-of-range percentile/confidence request
    #[error("invalid {context} parameter: {reason}")]
    InvalidParameter { context: String, reason: String },

    /// Distribution kind outside the supported set
    #[error("unsupported distribution `{0}`")]
    InvalidDistribution(String),

    /// Correlation matrix that is not symmetric or not positive semi-definite
    #[error("invalid correlation matrix: {0}")]
    InvalidCorrelation(String),

    /// Mismatched names, exceeded caps, or a trial count rejected by the limits
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The outcome function failed while evaluating a trial
    #[error("outcome function failed at trial {trial}: {source}")]
    OutcomeFunction {
        trial: usize,
        #[source]
        source: BoxError,
    },
}

impl SimulationError {
    pub(crate) fn invalid_parameter(context: impl Into<String>, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            context: context.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimulationError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_display_messages() {
        let err = SimulationError::invalid_parameter("normal", "std must be non-negative");
        assert_eq!(
            err.to_string(),
            "invalid normal parameter: std must be non-negative"
        );

        let err = SimulationError::InvalidDistribution("cauchy".to_string());
        assert_eq!(err.to_string(), "unsupported distribution `cauchy`");
    }

    #[test]
    fn test_outcome_error_exposes_source() {
        let inner: BoxError = "division by zero".into();
        let err = SimulationError::OutcomeFunction {
            trial: 7,
            source: inner,
        };
        assert!(err.to_string().contains("trial 7"));
        assert_eq!(err.source().unwrap().to_string(), "division by zero");
    }
}
