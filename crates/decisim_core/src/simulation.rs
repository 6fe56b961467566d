//! Simulation runner: sampling, correlation and outcome evaluation for one run.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution as _, StandardNormal};
use rustc_hash::FxHashSet;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::SimulationConfig;
use crate::correlation::{CorrelationInjector, apply_marginal};
use crate::error::{BoxError, Result, SimulationError};
use crate::model::{Assumption, CorrelationMatrix, Distribution, SampleSet, SimulationRun};

/// Outcome functions must return finite values
#[derive(Debug, Error)]
#[error("outcome function returned non-finite value {0}")]
pub struct NonFiniteOutcome(pub f64);

/// One trial's assumption values, passed to the outcome function.
#[derive(Debug, Clone, Copy)]
pub struct Trial<'a> {
    index: usize,
    names: &'a [String],
    values: &'a [f64],
}

impl<'a> Trial<'a> {
    pub(crate) fn new(index: usize, names: &'a [String], values: &'a [f64]) -> Self {
        Self {
            index,
            names,
            values,
        }
    }

    /// Trial index in `0..N`
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Like [`Trial::get`] but an unknown name is an error, for use with `?`
    /// inside outcome functions.
    pub fn value(&self, name: &str) -> Result<f64> {
        self.get(name)
            .ok_or_else(|| SimulationError::config(format!("no assumption named `{name}`")))
    }

    /// `(name, value)` pairs in assumption order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, f64)> + 'a {
        self.names
            .iter()
            .zip(self.values)
            .map(|(n, v)| (n.as_str(), *v))
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn evaluate<F, E>(f: &F, trial: &Trial<'_>) -> Result<f64>
where
    F: Fn(&Trial<'_>) -> std::result::Result<f64, E>,
    E: Into<BoxError>,
{
    let outcome = f(trial).map_err(|e| SimulationError::OutcomeFunction {
        trial: trial.index(),
        source: e.into(),
    })?;
    if !outcome.is_finite() {
        return Err(SimulationError::OutcomeFunction {
            trial: trial.index(),
            source: Box::new(NonFiniteOutcome(outcome)),
        });
    }
    Ok(outcome)
}

/// A validated simulation plan. All parameter, limit and correlation checks
/// happen in [`SimulationRunner::new`], before any randomness is consumed.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    names: Vec<String>,
    distributions: Vec<Distribution>,
    injector: Option<CorrelationInjector>,
    config: SimulationConfig,
}

impl SimulationRunner {
    pub fn new(
        assumptions: &[Assumption],
        correlation: Option<&CorrelationMatrix>,
        config: &SimulationConfig,
    ) -> Result<Self> {
        config.validate(assumptions.len())?;

        let mut seen = FxHashSet::default();
        for assumption in assumptions {
            if !seen.insert(assumption.name.as_str()) {
                return Err(SimulationError::config(format!(
                    "duplicate assumption name `{}`",
                    assumption.name
                )));
            }
        }

        let names: Vec<String> = assumptions.iter().map(|a| a.name.clone()).collect();
        let distributions = assumptions
            .iter()
            .map(Assumption::resolve)
            .collect::<Result<Vec<_>>>()?;

        let injector = match correlation {
            Some(matrix) => {
                matrix.check_shape()?;
                if let Some(extra) = matrix.names().iter().find(|n| !seen.contains(n.as_str())) {
                    return Err(SimulationError::config(format!(
                        "correlation matrix names `{extra}`, which is not an assumption"
                    )));
                }
                // Align the matrix with the caller's assumption order
                let aligned = matrix.reordered(&names)?;
                Some(CorrelationInjector::new(&aligned)?)
            }
            None => None,
        };

        Ok(Self {
            names,
            distributions,
            injector,
            config: config.clone(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn distributions(&self) -> &[Distribution] {
        &self.distributions
    }

    pub fn is_correlated(&self) -> bool {
        self.injector.is_some()
    }

    /// Draw every assumption's sample vector from `rng`, assumptions in order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SampleSet> {
        let n = self.config.num_simulations;

        let columns = match &self.injector {
            None => self
                .distributions
                .iter()
                .map(|d| d.sample_n(rng, n))
                .collect::<Result<Vec<_>>>()?,
            Some(injector) => {
                let normals: Vec<Vec<f64>> = self
                    .names
                    .iter()
                    .map(|_| (0..n).map(|_| StandardNormal.sample(&mut *rng)).collect::<Vec<f64>>())
                    .collect();
                let independent = SampleSet::from_columns(self.names.clone(), normals)?;
                let correlated = injector.correlate(&independent)?;
                self.distributions
                    .iter()
                    .zip(correlated.columns())
                    .map(|(d, w)| apply_marginal(d, w))
                    .collect::<Result<Vec<_>>>()?
            }
        };

        SampleSet::from_columns(self.names.clone(), columns)
    }

    /// Run all trials. The outcome function is evaluated once per trial index
    /// `0..N`; the first failure aborts the run.
    pub fn run<F, E>(&self, outcome: F) -> Result<SimulationRun>
    where
        F: Fn(&Trial<'_>) -> std::result::Result<f64, E> + Sync,
        E: Into<BoxError> + Send,
    {
        let seed = self
            .config
            .random_seed
            .unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        tracing::debug!(
            assumptions = self.names.len(),
            trials = self.config.num_simulations,
            seed,
            correlated = self.is_correlated(),
            "starting simulation run"
        );

        let samples = self.sample(&mut rng)?;
        let outcomes = self.evaluate_all(&samples, &outcome)?;

        tracing::debug!(trials = outcomes.len(), "simulation run complete");

        Ok(SimulationRun {
            seed,
            num_simulations: self.config.num_simulations,
            correlated: self.is_correlated(),
            outcomes,
            samples,
        })
    }

    fn evaluate_all<F, E>(&self, samples: &SampleSet, outcome: &F) -> Result<Vec<f64>>
    where
        F: Fn(&Trial<'_>) -> std::result::Result<f64, E> + Sync,
        E: Into<BoxError> + Send,
    {
        let n = self.config.num_simulations;
        let columns = samples.columns();

        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                return (0..n)
                    .into_par_iter()
                    .map(|i| {
                        let row: Vec<f64> = columns.iter().map(|c| c[i]).collect();
                        evaluate(outcome, &Trial::new(i, &self.names, &row))
                    })
                    .collect();
            }
        }

        let mut row = vec![0.0; columns.len()];
        let mut outcomes = Vec::with_capacity(n);
        for i in 0..n {
            for (slot, column) in row.iter_mut().zip(columns) {
                *slot = column[i];
            }
            outcomes.push(evaluate(outcome, &Trial::new(i, &self.names, &row))?);
        }
        Ok(outcomes)
    }
}

/// Validate, sample and evaluate in one call.
///
/// ```ignore
/// let run = simulate(
///     &[Assumption::normal("roi", 0.15, 0.05)],
///     None,
///     &SimulationConfig::new(1_000).with_seed(42),
///     |t| t.value("roi"),
/// )?;
/// ```
pub fn simulate<F, E>(
    assumptions: &[Assumption],
    correlation: Option<&CorrelationMatrix>,
    config: &SimulationConfig,
    outcome: F,
) -> Result<SimulationRun>
where
    F: Fn(&Trial<'_>) -> std::result::Result<f64, E> + Sync,
    E: Into<BoxError> + Send,
{
    SimulationRunner::new(assumptions, correlation, config)?.run(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_trial_accessors() {
        let names = vec!["a".to_string(), "b".to_string()];
        let values = [1.5, 2.5];
        let trial = Trial::new(3, &names, &values);

        assert_eq!(trial.index(), 3);
        assert_eq!(trial.get("b"), Some(2.5));
        assert_eq!(trial.get("c"), None);
        assert!(trial.value("c").is_err());
        assert_eq!(trial.sum(), 4.0);
        assert_eq!(trial.iter().collect::<Vec<_>>(), vec![("a", 1.5), ("b", 2.5)]);
    }

    #[test]
    fn test_outcome_error_is_fail_fast() {
        let assumptions = [Assumption::uniform("x", 0.0, 1.0)];
        let config = SimulationConfig::new(100).with_seed(1);
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let err = simulate(&assumptions, None, &config, |t| {
            calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if t.index() == 10 {
                Err("boom")
            } else {
                Ok(t.sum())
            }
        })
        .unwrap_err();

        assert!(matches!(err, SimulationError::OutcomeFunction { trial: 10, .. }));
        assert_eq!(calls.load(std::sync::atomic::Ordering::Relaxed), 11);
    }

    #[test]
    fn test_non_finite_outcome_rejected() {
        let assumptions = [Assumption::uniform("x", 0.0, 1.0)];
        let config = SimulationConfig::new(10).with_seed(1);

        let err = simulate(&assumptions, None, &config, |_| Ok::<_, Infallible>(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, SimulationError::OutcomeFunction { trial: 0, .. }));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let assumptions = [
            Assumption::uniform("x", 0.0, 1.0),
            Assumption::uniform("x", 0.0, 2.0),
        ];
        let err = SimulationRunner::new(&assumptions, None, &SimulationConfig::new(10)).unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(_)));
    }

    #[test]
    fn test_invalid_parameters_fail_before_sampling() {
        let assumptions = [
            Assumption::uniform("x", 0.0, 1.0),
            Assumption::normal("y", 0.0, -1.0),
        ];
        let err = SimulationRunner::new(&assumptions, None, &SimulationConfig::new(10)).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidParameter { .. }));
    }

    #[test]
    fn test_correlation_name_mismatch() {
        let assumptions = [
            Assumption::normal("a", 0.0, 1.0),
            Assumption::normal("b", 0.0, 1.0),
        ];
        let config = SimulationConfig::new(10);

        let extra = CorrelationMatrix::identity(vec!["a".into(), "c".into()]).unwrap();
        let err = SimulationRunner::new(&assumptions, Some(&extra), &config).unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(_)));

        let missing = CorrelationMatrix::identity(vec!["a".into()]).unwrap();
        let err = SimulationRunner::new(&assumptions, Some(&missing), &config).unwrap_err();
        assert!(matches!(err, SimulationError::Configuration(_)));
    }

    #[test]
    fn test_entropy_seed_is_reported_and_replayable() {
        let assumptions = [Assumption::normal("x", 0.0, 1.0)];
        let first = simulate(&assumptions, None, &SimulationConfig::new(50), |t| {
            Ok::<_, Infallible>(t.sum())
        })
        .unwrap();

        let replay = simulate(
            &assumptions,
            None,
            &SimulationConfig::new(50).with_seed(first.seed),
            |t| Ok::<_, Infallible>(t.sum()),
        )
        .unwrap();
        assert_eq!(first.outcomes, replay.outcomes);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        let assumptions = [
            Assumption::gamma("g", 2.0, 1.5),
            Assumption::beta("b", 2.0, 3.0),
        ];
        let serial = SimulationConfig::new(5_000).with_seed(99);
        let parallel = serial.clone().with_parallel(true);
        let f = |t: &Trial<'_>| -> Result<f64> { Ok(t.value("g")? * t.value("b")?) };

        let a = simulate(&assumptions, None, &serial, f).unwrap();
        let b = simulate(&assumptions, None, &parallel, f).unwrap();
        assert_eq!(a.outcomes, b.outcomes);
    }
}
