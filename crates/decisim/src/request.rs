//! Request documents and caller-side input validation.
//!
//! Requests are YAML files; every tool's request type is loaded through
//! [`load_request`] and checked against [`InputLimits`] before the engine
//! sees it.

use std::path::Path;

use decisim_core::SimulationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the tool layer
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{field} too long (max {max} chars), got {len}")]
    TextTooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("too many assumptions (max {max}), got {got}")]
    TooManyAssumptions { max: usize, got: usize },

    #[error("{field} must be between 1 and {max}, got {got}")]
    TrialCount {
        field: &'static str,
        max: usize,
        got: usize,
    },

    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("simulation produced no outcomes")]
    NoData,

    #[error("failed to read request {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse request: {0}")]
    Parse(#[from] serde_saphyr::Error),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Limits applied to every caller-supplied request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLimits {
    pub max_string_length: usize,
    pub max_assumptions: usize,
    pub max_simulations: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_string_length: 500,
            max_assumptions: 20,
            max_simulations: 100_000,
        }
    }
}

impl InputLimits {
    pub fn check_text(&self, field: &'static str, text: &str) -> Result<(), ToolError> {
        let len = text.chars().count();
        if len > self.max_string_length {
            return Err(ToolError::TextTooLong {
                field,
                max: self.max_string_length,
                len,
            });
        }
        Ok(())
    }

    pub fn check_assumptions(&self, count: usize) -> Result<(), ToolError> {
        if count > self.max_assumptions {
            return Err(ToolError::TooManyAssumptions {
                max: self.max_assumptions,
                got: count,
            });
        }
        Ok(())
    }

    pub fn check_trials(&self, field: &'static str, count: usize) -> Result<(), ToolError> {
        if count == 0 || count > self.max_simulations {
            return Err(ToolError::TrialCount {
                field,
                max: self.max_simulations,
                got: count,
            });
        }
        Ok(())
    }

    /// The engine-side caps matching these limits
    pub fn simulation_limits(&self) -> decisim_core::SimulationLimits {
        decisim_core::SimulationLimits {
            max_simulations: self.max_simulations,
            max_assumptions: self.max_assumptions,
            require_trials: true,
        }
    }
}

/// Parse a request from YAML text
pub fn parse_request<T: DeserializeOwned>(yaml: &str) -> Result<T, ToolError> {
    Ok(serde_saphyr::from_str(yaml)?)
}

/// Read and parse a YAML request file
pub fn load_request<T: DeserializeOwned>(path: &Path) -> Result<T, ToolError> {
    let content = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.display().to_string(),
        source,
    })?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "loaded request");
    parse_request(&content)
}
