//! Monte Carlo decision-confidence engine
//!
//! This crate turns a set of uncertain inputs into a probability-weighted
//! answer instead of a single point estimate. It supports:
//! - Seven named distributions (normal, lognormal, uniform, triangular,
//!   exponential, beta, gamma) with validated parameters
//! - Gaussian-copula correlation between inputs via a Cholesky factor
//! - Seeded, bit-reproducible runs with optional parallel outcome evaluation
//! - Summary statistics, percentiles and confidence intervals
//! - Sensitivity ranking by correlation or one-at-a-time perturbation
//!
//! # Example
//!
//! ```ignore
//! use decisim_core::{Assumption, SimulationConfig, simulate};
//! use decisim_core::analysis::{SuccessCriterion, StatisticsAggregator, confidence_level};
//!
//! let run = simulate(
//!     &[Assumption::normal("roi", 0.15, 0.05)],
//!     None,
//!     &SimulationConfig::new(1_000).with_seed(42),
//!     |t| t.value("roi"),
//! )?;
//!
//! let confidence = confidence_level(&run.outcomes, &SuccessCriterion::at_least(0.10));
//! let stats = StatisticsAggregator::default().summarize(&run.outcomes)?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod analysis;
pub mod correlation;
pub mod error;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod config;
pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use config::{SimulationConfig, SimulationLimits};
pub use error::{BoxError, Result, SimulationError};
pub use model::{
    Assumption, CorrelationMatrix, Distribution, DistributionKind, SampleSet, SimulationRun,
};
pub use simulation::{SimulationRunner, Trial, simulate};
