//! Post-run analysis: statistics, influence ranking and confidence labelling.
//!
//! Everything here is a pure function of a completed [`SimulationRun`]'s
//! outcome and sample vectors (or, for the perturbation tornado, of the
//! assumptions and outcome function). Nothing is cached between calls.
//!
//! ```ignore
//! use decisim_core::analysis::{StatisticsAggregator, SensitivityMethod, analyze};
//!
//! let run = simulate(&assumptions, None, &config, outcome)?;
//! let stats = StatisticsAggregator::default().summarize(&run.outcomes)?;
//! let ranking = analyze(&run.samples, &run.outcomes, SensitivityMethod::Spearman)?;
//! ```
//!
//! [`SimulationRun`]: crate::model::SimulationRun

mod confidence;
mod sensitivity;
mod statistics;

pub use confidence::*;
pub use sensitivity::*;
pub use statistics::*;
