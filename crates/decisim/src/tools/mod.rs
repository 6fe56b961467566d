//! Decision tools built on the simulation engine.
//!
//! Each tool is a request type deserialized from YAML that validates itself
//! against [`InputLimits`], translates the question into assumptions and an
//! outcome function, and returns a serializable report.

mod confidence;
mod scenario;

pub use confidence::*;
pub use scenario::*;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::request::{InputLimits, ToolError};

pub(crate) fn default_num_simulations() -> usize {
    10_000
}

pub(crate) fn default_num_scenarios() -> usize {
    1_000
}

pub trait ToolRequest: DeserializeOwned {
    type Report: Serialize;

    /// Command-line overrides for the seed and trial count
    fn apply_overrides(&mut self, seed: Option<u64>, num_simulations: Option<usize>);

    fn run(&self, limits: &InputLimits) -> Result<Self::Report, ToolError>;
}
