//! Per-assumption influence on the outcome.
//!
//! Two techniques are offered:
//!
//! - [`analyze`] correlates each assumption's sample vector with the outcome
//!   vector of a completed run. It is free (no re-simulation) but linear: an
//!   assumption with a strongly non-monotonic effect scores low.
//! - [`perturbation_sensitivity`] holds every assumption at its median and
//!   swings one at a time between two quantiles, re-evaluating the outcome
//!   function. It sees non-linear effects but ignores interactions.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{BoxError, Result, SimulationError};
use crate::model::{Assumption, SampleSet};
use crate::simulation::Trial;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityMethod {
    /// Linear (product-moment) correlation
    #[default]
    Pearson,
    /// Rank correlation, average ranks for ties
    Spearman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    None,
}

impl Direction {
    fn of(value: f64) -> Self {
        if value > 0.0 {
            Self::Positive
        } else if value < 0.0 {
            Self::Negative
        } else {
            Self::None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    pub assumption: String,
    /// `|r|` in [0, 1]
    pub influence: f64,
    pub direction: Direction,
    /// `r²`, the share of outcome variance the assumption explains linearly
    pub contribution: f64,
    /// The assumption's samples were constant
    pub degenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub method: SensitivityMethod,
    /// Descending influence, name-ascending ties, degenerate entries last
    pub entries: Vec<Influence>,
}

impl SensitivityResult {
    pub fn get(&self, assumption: &str) -> Option<&Influence> {
        self.entries.iter().find(|e| e.assumption == assumption)
    }

    /// Entries whose influence exceeds `threshold`, in ranked order
    pub fn above(&self, threshold: f64) -> impl Iterator<Item = &Influence> {
        self.entries.iter().filter(move |e| e.influence > threshold)
    }
}

fn is_constant(values: &[f64]) -> bool {
    values.first().is_none_or(|first| values.iter().all(|v| v == first))
}

/// Correlation coefficient, `0.0` when either side has no spread.
fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;

    let (sxy, sxx, syy) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0, 0.0), |(sxy, sxx, syy), (a, b)| {
            let (da, db) = (a - mx, b - my);
            (sxy + da * db, sxx + da * da, syy + db * db)
        });

    let denom = (sxx * syy).sqrt();
    if denom > 0.0 {
        (sxy / denom).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// 1-based ranks, ties share the average of the ranks they span
fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = avg;
        }
        start = end;
    }
    ranks
}

fn correlation(method: SensitivityMethod, x: &[f64], y: &[f64]) -> f64 {
    match method {
        SensitivityMethod::Pearson => pearson(x, y),
        SensitivityMethod::Spearman => pearson(&ranks(x), &ranks(y)),
    }
}

fn rank_order(a: &Influence, b: &Influence) -> Ordering {
    a.degenerate
        .cmp(&b.degenerate)
        .then_with(|| b.influence.total_cmp(&a.influence))
        .then_with(|| a.assumption.cmp(&b.assumption))
}

/// Rank assumptions by their correlation with the outcome over the same
/// trials. Constant assumptions score 0 and sort last.
pub fn analyze(
    samples: &SampleSet,
    outcomes: &[f64],
    method: SensitivityMethod,
) -> Result<SensitivityResult> {
    if samples.num_trials() != outcomes.len() && !samples.is_empty() {
        return Err(SimulationError::config(format!(
            "{} outcomes for {} sampled trials",
            outcomes.len(),
            samples.num_trials()
        )));
    }

    let outcome_constant = is_constant(outcomes);
    let mut entries: Vec<Influence> = samples
        .iter()
        .map(|(name, values)| {
            let degenerate = is_constant(values);
            let r = if degenerate || outcome_constant {
                0.0
            } else {
                correlation(method, values, outcomes)
            };
            Influence {
                assumption: name.to_string(),
                influence: r.abs(),
                direction: Direction::of(r),
                contribution: r * r,
                degenerate,
            }
        })
        .collect();

    entries.sort_by(rank_order);
    tracing::trace!(?method, assumptions = entries.len(), "ranked sensitivity");

    Ok(SensitivityResult { method, entries })
}

/// One row of a perturbation tornado
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoEntry {
    pub assumption: String,
    pub low_value: f64,
    pub high_value: f64,
    pub low_outcome: f64,
    pub high_outcome: f64,
    /// `|high_outcome - low_outcome|`
    pub swing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoResult {
    /// Outcome with every assumption at its median
    pub baseline_outcome: f64,
    /// Sorted by descending swing, name-ascending ties
    pub entries: Vec<TornadoEntry>,
}

/// Quantile pair each assumption is swung between
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerturbationRange {
    pub low: f64,
    pub high: f64,
}

impl Default for PerturbationRange {
    fn default() -> Self {
        Self {
            low: 0.10,
            high: 0.90,
        }
    }
}

/// One-at-a-time sensitivity: every assumption at its median, then each one
/// in turn moved to the `range` quantiles. Deterministic, no sampling.
pub fn perturbation_sensitivity<F, E>(
    assumptions: &[Assumption],
    range: PerturbationRange,
    outcome: F,
) -> Result<TornadoResult>
where
    F: Fn(&Trial<'_>) -> std::result::Result<f64, E>,
    E: Into<BoxError>,
{
    if !(0.0..=1.0).contains(&range.low) || !(0.0..=1.0).contains(&range.high) {
        return Err(SimulationError::invalid_parameter(
            "perturbation",
            format!("quantiles must be in [0, 1], got {} and {}", range.low, range.high),
        ));
    }

    let names: Vec<String> = assumptions.iter().map(|a| a.name.clone()).collect();
    let distributions = assumptions
        .iter()
        .map(Assumption::resolve)
        .collect::<Result<Vec<_>>>()?;
    let baseline = distributions
        .iter()
        .map(|d| d.quantile(0.5))
        .collect::<Result<Vec<_>>>()?;

    let mut evaluations = 0;
    let mut eval = |values: &[f64]| -> Result<f64> {
        let index = evaluations;
        evaluations += 1;
        let value = outcome(&Trial::new(index, &names, values)).map_err(|e| {
            SimulationError::OutcomeFunction {
                trial: index,
                source: e.into(),
            }
        })?;
        if !value.is_finite() {
            return Err(SimulationError::OutcomeFunction {
                trial: index,
                source: Box::new(crate::simulation::NonFiniteOutcome(value)),
            });
        }
        Ok(value)
    };

    let baseline_outcome = eval(&baseline)?;

    let mut entries = Vec::with_capacity(assumptions.len());
    let mut values = baseline.clone();
    for (i, distribution) in distributions.iter().enumerate() {
        let low_value = distribution.quantile(range.low)?;
        let high_value = distribution.quantile(range.high)?;

        values[i] = low_value;
        let low_outcome = eval(&values)?;
        values[i] = high_value;
        let high_outcome = eval(&values)?;
        values[i] = baseline[i];

        entries.push(TornadoEntry {
            assumption: names[i].clone(),
            low_value,
            high_value,
            low_outcome,
            high_outcome,
            swing: (high_outcome - low_outcome).abs(),
        });
    }

    entries.sort_by(|a, b| {
        b.swing
            .total_cmp(&a.swing)
            .then_with(|| a.assumption.cmp(&b.assumption))
    });

    Ok(TornadoResult {
        baseline_outcome,
        entries,
    })
}
