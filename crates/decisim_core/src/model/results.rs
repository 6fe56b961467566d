//! Simulation outputs: per-assumption samples and the outcome vector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Sequence of N outcome values, one per trial in index order
pub type OutcomeVector = Vec<f64>;

/// Per-assumption sample vectors from one run, kept in assumption order.
/// Every column has the same length (the trial count).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSet {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl SampleSet {
    /// Build from named columns; every column must have the same length.
    pub fn from_columns(names: Vec<String>, columns: Vec<Vec<f64>>) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(SimulationError::config(format!(
                "{} names for {} sample columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some(first) = columns.first()
            && let Some((i, c)) = columns.iter().enumerate().find(|(_, c)| c.len() != first.len())
        {
            return Err(SimulationError::config(format!(
                "sample column `{}` has {} trials, expected {}",
                names[i],
                c.len(),
                first.len()
            )));
        }
        Ok(Self { names, columns })
    }

    /// Sample vector for an assumption
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    /// Assumption names in run order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, samples)` pairs in run order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.names
            .iter()
            .zip(&self.columns)
            .map(|(n, c)| (n.as_str(), c.as_slice()))
    }

    /// Number of assumptions
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of trials per assumption
    pub fn num_trials(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Values of every assumption at one trial index
    pub fn trial_values(&self, trial: usize) -> Option<Vec<f64>> {
        self.columns.iter().map(|c| c.get(trial).copied()).collect()
    }

    pub(crate) fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<f64>> {
        self.names.into_iter().zip(self.columns).collect()
    }
}

/// Everything one simulation run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    /// Seed the run's random source was built from (drawn from entropy when
    /// the config had none)
    pub seed: u64,
    pub num_simulations: usize,
    /// Whether the samples were drawn through the correlation injector
    pub correlated: bool,
    pub outcomes: OutcomeVector,
    pub samples: SampleSet,
}
