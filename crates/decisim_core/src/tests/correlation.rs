//! Tests for correlated sampling
//!
//! These tests verify that:
//! - The copula induces the requested rank correlation for every family
//! - Marginals keep their own shape under correlation
//! - Invalid matrices are rejected before any sampling

use std::convert::Infallible;

use proptest::prelude::*;

use crate::analysis::{SensitivityMethod, StatisticsAggregator};
use crate::config::SimulationConfig;
use crate::correlation::CorrelationInjector;
use crate::error::SimulationError;
use crate::model::{Assumption, CorrelationMatrix, SampleSet};
use crate::simulation::{SimulationRunner, simulate};

fn spearman(samples: &SampleSet, a: &str, b: &str) -> f64 {
    // Rank correlation of a against b, via the analyzer with b as the outcome
    let x = SampleSet::from_columns(vec![a.to_string()], vec![samples.get(a).unwrap().to_vec()])
        .unwrap();
    let result =
        crate::analysis::analyze(&x, samples.get(b).unwrap(), SensitivityMethod::Spearman).unwrap();
    let entry = &result.entries[0];
    match entry.direction {
        crate::analysis::Direction::Negative => -entry.influence,
        _ => entry.influence,
    }
}

#[test]
fn test_copula_applies_to_all_families() {
    let assumptions = [
        Assumption::lognormal("ln", 0.0, 0.5),
        Assumption::triangular("tri", 0.0, 2.0, 10.0),
        Assumption::exponential("exp", 2.0),
        Assumption::beta("beta", 2.0, 5.0),
        Assumption::gamma("gamma", 3.0, 2.0),
    ];
    let names: Vec<String> = assumptions.iter().map(|a| a.name.clone()).collect();
    let matrix = CorrelationMatrix::from_pairs(
        names,
        [("ln", "tri", 0.7), ("exp", "beta", -0.5), ("beta", "gamma", 0.3)],
    )
    .unwrap();

    let run = simulate(
        &assumptions,
        Some(&matrix),
        &SimulationConfig::new(5_000).with_seed(17),
        |t| Ok::<_, Infallible>(t.sum()),
    )
    .unwrap();

    // Rank correlation under a Gaussian copula: 6/π · asin(ρ/2)
    let expected = |rho: f64| 6.0 / std::f64::consts::PI * (rho / 2.0).asin();
    let s = &run.samples;
    assert!((spearman(s, "ln", "tri") - expected(0.7)).abs() < 0.05);
    assert!((spearman(s, "exp", "beta") - expected(-0.5)).abs() < 0.05);
    assert!(spearman(s, "ln", "gamma").abs() < 0.05);

    // Marginal means survive the transform
    let agg = StatisticsAggregator::default();
    let mean = |name: &str| agg.summarize(s.get(name).unwrap()).unwrap().summary().unwrap().mean;
    assert!((mean("tri") - 4.0).abs() < 0.15);
    assert!((mean("exp") - 0.5).abs() < 0.03);
    assert!((mean("beta") - 2.0 / 7.0).abs() < 0.01);
    assert!((mean("gamma") - 6.0).abs() < 0.2);
    assert!(s.get("beta").unwrap().iter().all(|v| (0.0..=1.0).contains(v)));
    assert!(s.get("exp").unwrap().iter().all(|v| *v >= 0.0 && v.is_finite()));
}

#[test]
fn test_matrix_order_independent_of_assumption_order() {
    let assumptions = [
        Assumption::normal("x", 0.0, 1.0),
        Assumption::normal("y", 0.0, 1.0),
    ];
    let forward =
        CorrelationMatrix::from_pairs(vec!["x".into(), "y".into()], [("x", "y", 0.5)]).unwrap();
    let reversed =
        CorrelationMatrix::from_pairs(vec!["y".into(), "x".into()], [("x", "y", 0.5)]).unwrap();
    let config = SimulationConfig::new(500).with_seed(4);

    let a = simulate(&assumptions, Some(&forward), &config, |t| Ok::<_, Infallible>(t.sum())).unwrap();
    let b = simulate(&assumptions, Some(&reversed), &config, |t| Ok::<_, Infallible>(t.sum())).unwrap();
    assert_eq!(a.outcomes, b.outcomes);
}

#[test]
fn test_invalid_matrix_rejected_before_sampling() {
    let assumptions = [
        Assumption::normal("a", 0.0, 1.0),
        Assumption::normal("b", 0.0, 1.0),
        Assumption::normal("c", 0.0, 1.0),
    ];
    let indefinite = CorrelationMatrix::from_pairs(
        vec!["a".into(), "b".into(), "c".into()],
        [("a", "b", 0.95), ("a", "c", 0.95), ("b", "c", -0.95)],
    )
    .unwrap();

    let err = SimulationRunner::new(&assumptions, Some(&indefinite), &SimulationConfig::new(10))
        .unwrap_err();
    assert!(matches!(err, SimulationError::InvalidCorrelation(_)));
}

proptest! {
    #[test]
    fn prop_asymmetric_matrix_rejected(rho in -0.5f64..0.5, delta in 1e-8f64..0.4) {
        let m = CorrelationMatrix::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, rho], vec![rho + delta, 1.0]],
        )
        .unwrap();
        let rejected = matches!(
            CorrelationInjector::new(&m),
            Err(SimulationError::InvalidCorrelation(_))
        );
        prop_assert!(rejected);
    }

    #[test]
    fn prop_valid_two_by_two_accepted(rho in -1.0f64..=1.0) {
        let m = CorrelationMatrix::from_pairs(vec!["a".into(), "b".into()], [("a", "b", rho)])
            .unwrap();
        prop_assert!(CorrelationInjector::new(&m).is_ok());
    }

    #[test]
    fn prop_indefinite_three_by_three_rejected(rho in 0.6f64..=1.0) {
        // Eigenvalues are 1 + ρ (twice) and 1 - 2ρ
        let m = CorrelationMatrix::from_pairs(
            vec!["a".into(), "b".into(), "c".into()],
            [("a", "b", rho), ("a", "c", rho), ("b", "c", -rho)],
        )
        .unwrap();
        let rejected = matches!(
            CorrelationInjector::new(&m),
            Err(SimulationError::InvalidCorrelation(_))
        );
        prop_assert!(rejected);
    }
}
