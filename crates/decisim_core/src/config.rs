//! Run configuration
//!
//! `SimulationConfig` is everything the runner needs besides the assumptions,
//! the optional correlation matrix and the outcome function. Process-wide caps
//! live in `SimulationLimits` and are passed in explicitly rather than read
//! from globals, so the engine stays free of environment coupling.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

fn default_num_simulations() -> usize {
    10_000
}

/// Caps enforced before any sampling begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationLimits {
    pub max_simulations: usize,
    pub max_assumptions: usize,
    /// Reject zero-trial runs instead of returning empty vectors
    #[serde(default)]
    pub require_trials: bool,
}

impl Default for SimulationLimits {
    fn default() -> Self {
        Self {
            max_simulations: 100_000,
            max_assumptions: 20,
            require_trials: false,
        }
    }
}

impl SimulationLimits {
    /// No caps at all; zero trials allowed
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_simulations: usize::MAX,
            max_assumptions: usize::MAX,
            require_trials: false,
        }
    }
}

/// Configuration for a single simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,

    /// Identical seeds with identical inputs produce bit-identical outcomes.
    /// `None` draws a fresh seed from OS entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Evaluate the outcome function across threads. Sampling stays on a
    /// single random stream, so results do not depend on this flag.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub limits: SimulationLimits,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_simulations: default_num_simulations(),
            random_seed: None,
            parallel: false,
            limits: SimulationLimits::default(),
        }
    }
}

impl SimulationConfig {
    #[must_use]
    pub fn new(num_simulations: usize) -> Self {
        Self {
            num_simulations,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: SimulationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Check the trial count and assumption count against the limits
    pub fn validate(&self, num_assumptions: usize) -> Result<()> {
        let limits = &self.limits;
        if self.num_simulations == 0 && limits.require_trials {
            return Err(SimulationError::config(
                "num_simulations must be positive, got 0",
            ));
        }
        if self.num_simulations > limits.max_simulations {
            return Err(SimulationError::config(format!(
                "num_simulations too large (max {}), got {}",
                limits.max_simulations, self.num_simulations
            )));
        }
        if num_assumptions > limits.max_assumptions {
            return Err(SimulationError::config(format!(
                "too many assumptions (max {}), got {num_assumptions}",
                limits.max_assumptions
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.num_simulations, 10_000);
        assert_eq!(config.random_seed, None);
        assert_eq!(config.limits.max_simulations, 100_000);
        assert_eq!(config.limits.max_assumptions, 20);
        assert!(config.validate(3).is_ok());
    }

    #[test]
    fn test_limits_enforced() {
        let too_many = SimulationConfig::new(100_001);
        assert!(matches!(
            too_many.validate(1),
            Err(SimulationError::Configuration(_))
        ));

        assert!(SimulationConfig::new(10).validate(21).is_err());

        let zero = SimulationConfig::new(0);
        assert!(zero.validate(1).is_ok());

        let strict = zero.with_limits(SimulationLimits {
            require_trials: true,
            ..Default::default()
        });
        assert!(strict.validate(1).is_err());

        let unbounded = SimulationConfig::new(1_000_000).with_limits(SimulationLimits::unbounded());
        assert!(unbounded.validate(500).is_ok());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: SimulationConfig = serde_json::from_str(r#"{"random_seed": 42}"#).unwrap();
        assert_eq!(config.num_simulations, 10_000);
        assert_eq!(config.random_seed, Some(42));
        assert!(!config.parallel);
    }
}
