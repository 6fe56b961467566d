//! Property-based checks on statistics and sensitivity

use proptest::prelude::*;

use crate::analysis::{Direction, SensitivityMethod, StatisticsAggregator, analyze, percentile};
use crate::model::SampleSet;

fn finite_values() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6f64..1.0e6, 1..200)
}

proptest! {
    #[test]
    fn prop_percentile_monotone(mut values in finite_values(), p1 in 0.0f64..=100.0, p2 in 0.0f64..=100.0) {
        values.sort_by(f64::total_cmp);
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        let a = percentile(&values, lo).unwrap().unwrap();
        let b = percentile(&values, hi).unwrap().unwrap();
        prop_assert!(a <= b, "P{lo} = {a} > P{hi} = {b}");
    }

    #[test]
    fn prop_summary_bounds(values in finite_values()) {
        let stats = StatisticsAggregator::default().summarize(&values).unwrap();
        let s = stats.summary().unwrap();
        prop_assert!(s.min <= s.median && s.median <= s.max);
        prop_assert!(s.confidence_interval.low <= s.confidence_interval.high);
        prop_assert!(s.variance >= 0.0);
        for pair in s.percentiles.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1);
        }
    }

    #[test]
    fn prop_sensitivity_sorted(
        columns in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 12), 1..6),
        outcome in prop::collection::vec(-100.0f64..100.0, 12),
        constant in -5.0f64..5.0,
        spearman in any::<bool>(),
    ) {
        let mut names: Vec<String> = (0..columns.len()).map(|i| format!("v{i}")).collect();
        let mut columns = columns;
        names.push("flat".to_string());
        columns.push(vec![constant; 12]);
        let samples = SampleSet::from_columns(names, columns).unwrap();
        let method = if spearman { SensitivityMethod::Spearman } else { SensitivityMethod::Pearson };

        let result = analyze(&samples, &outcome, method).unwrap();
        prop_assert!(result.entries.last().unwrap().degenerate);
        let flat = result.get("flat").unwrap();
        prop_assert_eq!(flat.influence, 0.0);
        prop_assert_eq!(flat.direction, Direction::None);

        for pair in result.entries.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.degenerate == b.degenerate {
                prop_assert!(
                    a.influence > b.influence
                        || (a.influence == b.influence && a.assumption < b.assumption)
                );
            }
            prop_assert!((0.0..=1.0).contains(&a.influence));
        }
    }
}
