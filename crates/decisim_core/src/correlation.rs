//! Gaussian-copula correlation injection.
//!
//! Independent standard normals `Z` become correlated normals `W = L * Z`,
//! where `L` is the lower-triangular Cholesky factor of the correlation
//! matrix (`C = L * Lᵗ`). Each correlated normal is then pushed through
//! `Φ` and the assumption's own quantile function, so the correlation
//! structure is decoupled from the marginal shape.
//!
//! Rank correlation is preserved exactly by the copula; linear correlation of
//! non-normal marginals is close to, but not exactly, the target.

use nalgebra::DMatrix;

use crate::error::{Result, SimulationError};
use crate::model::{CorrelationMatrix, Distribution, SampleSet, standard_normal_cdf};

/// Maximum allowed `|c_ij - c_ji|`
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;
/// Smallest eigenvalue still accepted as positive semi-definite
pub const EIGENVALUE_TOLERANCE: f64 = 1e-10;
/// Pivots at or below this are treated as zero (rank-deficient matrix)
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Reject matrices that are not symmetric within [`SYMMETRY_TOLERANCE`]
pub fn check_symmetric(matrix: &CorrelationMatrix) -> Result<()> {
    let rows = matrix.rows();
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let diff = (rows[i][j] - rows[j][i]).abs();
            if diff > SYMMETRY_TOLERANCE {
                return Err(SimulationError::InvalidCorrelation(format!(
                    "not symmetric: ({i}, {j}) = {} but ({j}, {i}) = {}",
                    rows[i][j], rows[j][i]
                )));
            }
        }
    }
    Ok(())
}

/// Smallest eigenvalue of the symmetric part of the matrix
#[must_use]
pub fn min_eigenvalue(matrix: &CorrelationMatrix) -> f64 {
    let n = matrix.dim();
    if n == 0 {
        return 1.0;
    }
    let rows = matrix.rows();
    let m = DMatrix::from_fn(n, n, |i, j| 0.5 * (rows[i][j] + rows[j][i]));
    m.symmetric_eigenvalues().min()
}

/// Reject matrices that are not positive semi-definite within [`EIGENVALUE_TOLERANCE`]
pub fn check_positive_semidefinite(matrix: &CorrelationMatrix) -> Result<()> {
    let min = min_eigenvalue(matrix);
    if min < -EIGENVALUE_TOLERANCE {
        return Err(SimulationError::InvalidCorrelation(format!(
            "not positive semi-definite: smallest eigenvalue is {min:e}"
        )));
    }
    Ok(())
}

/// Cholesky factorisation that tolerates singular (semi-definite) input by
/// zeroing columns whose pivot vanishes.
fn cholesky_semidefinite(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut lower = vec![vec![0.0; n]; n];

    for j in 0..n {
        let pivot = rows[j][j] - lower[j][..j].iter().map(|v| v * v).sum::<f64>();
        if pivot <= PIVOT_TOLERANCE {
            continue;
        }
        let diag = pivot.sqrt();
        lower[j][j] = diag;

        for i in (j + 1)..n {
            let dot: f64 = lower[i][..j]
                .iter()
                .zip(&lower[j][..j])
                .map(|(a, b)| a * b)
                .sum();
            let sym = 0.5 * (rows[i][j] + rows[j][i]);
            lower[i][j] = (sym - dot) / diag;
        }
    }
    lower
}

/// Validated, factored correlation structure for a fixed ordering of names.
#[derive(Debug, Clone)]
pub struct CorrelationInjector {
    names: Vec<String>,
    lower: Vec<Vec<f64>>,
}

impl CorrelationInjector {
    /// Validate symmetry and positive semi-definiteness, then factor.
    pub fn new(matrix: &CorrelationMatrix) -> Result<Self> {
        matrix.check_shape()?;
        check_symmetric(matrix)?;
        check_positive_semidefinite(matrix)?;

        let lower = cholesky_semidefinite(matrix.rows());
        tracing::debug!(dim = matrix.dim(), "factored correlation matrix");

        Ok(Self {
            names: matrix.names().to_vec(),
            lower,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Lower-triangular factor `L` with `L * Lᵗ` equal to the correlation matrix
    pub fn cholesky_factor(&self) -> &[Vec<f64>] {
        &self.lower
    }

    /// Apply `L` to one trial's independent normals (in injector order).
    pub fn correlate_trial(&self, independent: &[f64], out: &mut [f64]) {
        for (i, row) in self.lower.iter().enumerate() {
            out[i] = row[..=i]
                .iter()
                .zip(independent)
                .map(|(l, z)| l * z)
                .sum();
        }
    }

    /// Turn independent standard-normal columns into correlated ones.
    ///
    /// `independent` must hold exactly the injector's names (any order) with
    /// equal-length columns; the result follows the injector's order.
    pub fn correlate(&self, independent: &SampleSet) -> Result<SampleSet> {
        if independent.len() != self.names.len() {
            return Err(SimulationError::config(format!(
                "expected {} sample columns, got {}",
                self.names.len(),
                independent.len()
            )));
        }
        let columns = self
            .names
            .iter()
            .map(|name| {
                independent.get(name).ok_or_else(|| {
                    SimulationError::config(format!("no independent samples for `{name}`"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let n = independent.num_trials();
        let k = self.names.len();
        let mut out: Vec<Vec<f64>> = vec![Vec::with_capacity(n); k];
        let mut z = vec![0.0; k];
        let mut w = vec![0.0; k];

        for trial in 0..n {
            for (slot, column) in z.iter_mut().zip(&columns) {
                *slot = column[trial];
            }
            self.correlate_trial(&z, &mut w);
            for (column, value) in out.iter_mut().zip(&w) {
                column.push(*value);
            }
        }

        SampleSet::from_columns(self.names.clone(), out)
    }
}

/// Map correlated standard normals onto a marginal distribution through its
/// quantile function. Probabilities are clamped into the open unit interval
/// so unbounded marginals stay finite.
pub fn apply_marginal(distribution: &Distribution, normals: &[f64]) -> Result<Vec<f64>> {
    const EDGE: f64 = f64::EPSILON;
    let probs: Vec<f64> = normals
        .iter()
        .map(|&w| standard_normal_cdf(w).clamp(EDGE, 1.0 - EDGE))
        .collect();
    distribution.quantiles(&probs)
}
