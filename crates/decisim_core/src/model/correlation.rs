//! Correlation matrix keyed by assumption name.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Square correlation matrix whose rows and columns are labelled with
/// assumption names. Values are stored row-major.
///
/// Construction checks shape, range and the unit diagonal. Symmetry and
/// positive semi-definiteness are checked by the injector before factoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Vec<Vec<f64>>,
}

/// Diagonal entries must equal 1 within this tolerance
const DIAGONAL_TOLERANCE: f64 = 1e-9;

impl CorrelationMatrix {
    pub fn new(names: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        let matrix = Self { names, values };
        matrix.check_shape()?;
        Ok(matrix)
    }

    /// Identity matrix (all assumptions uncorrelated)
    pub fn identity(names: Vec<String>) -> Result<Self> {
        let n = names.len();
        let values = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self::new(names, values)
    }

    /// Build from an identity matrix plus symmetric pairwise coefficients
    pub fn from_pairs<'a>(
        names: Vec<String>,
        pairs: impl IntoIterator<Item = (&'a str, &'a str, f64)>,
    ) -> Result<Self> {
        let mut matrix = Self::identity(names)?;
        for (a, b, rho) in pairs {
            let i = matrix.index_of(a)?;
            let j = matrix.index_of(b)?;
            matrix.values[i][j] = rho;
            matrix.values[j][i] = rho;
        }
        matrix.check_shape()?;
        Ok(matrix)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SimulationError::config(format!("`{name}` is not in the correlation matrix")))
    }

    /// Validate dimensions, unique names, entry range and the unit diagonal.
    pub fn check_shape(&self) -> Result<()> {
        let n = self.names.len();
        if self.values.len() != n || self.values.iter().any(|row| row.len() != n) {
            return Err(SimulationError::InvalidCorrelation(format!(
                "matrix must be {n}x{n} to match its {n} names"
            )));
        }

        let mut seen = FxHashSet::default();
        for name in &self.names {
            if !seen.insert(name.as_str()) {
                return Err(SimulationError::config(format!(
                    "duplicate name `{name}` in correlation matrix"
                )));
            }
        }

        for (i, row) in self.values.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() || !(-1.0..=1.0).contains(&v) {
                    return Err(SimulationError::InvalidCorrelation(format!(
                        "entry ({i}, {j}) = {v} is outside [-1, 1]"
                    )));
                }
            }
            if (row[i] - 1.0).abs() > DIAGONAL_TOLERANCE {
                return Err(SimulationError::InvalidCorrelation(format!(
                    "diagonal entry ({i}, {i}) must be 1, got {}",
                    row[i]
                )));
            }
        }
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Coefficient between two named assumptions
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }

    /// Permute rows and columns into `order`, which must name exactly the
    /// same set of assumptions.
    pub fn reordered(&self, order: &[String]) -> Result<Self> {
        if order.len() != self.names.len() {
            return Err(SimulationError::config(format!(
                "correlation matrix covers {} assumptions but {} were supplied",
                self.names.len(),
                order.len()
            )));
        }
        let index: FxHashMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let positions = order
            .iter()
            .map(|name| {
                index.get(name.as_str()).copied().ok_or_else(|| {
                    SimulationError::config(format!(
                        "assumption `{name}` is missing from the correlation matrix"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let values = positions
            .iter()
            .map(|&i| positions.iter().map(|&j| self.values[i][j]).collect())
            .collect();
        Ok(Self {
            names: order.to_vec(),
            values,
        })
    }
}
