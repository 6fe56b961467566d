//! Reasoning-confidence tools: how likely is a recommendation to hold, and
//! how stable is it when its assumptions are stressed.

use std::collections::BTreeMap;

use decisim_core::analysis::{
    Comparison, Influence, SensitivityMethod, StatisticsAggregator, StatisticsSummary, SuccessCriterion,
    analyze, confidence_level, confidence_qualifier, robustness_qualifier,
};
use decisim_core::model::Params;
use decisim_core::{Assumption, DistributionKind, SimulationConfig, Trial, simulate};
use serde::{Deserialize, Serialize};

use super::{ToolRequest, default_num_simulations, default_num_scenarios};
use crate::request::{InputLimits, ToolError};

/// Contribution (r²) above which an assumption is reported as a key risk
pub const KEY_RISK_THRESHOLD: f64 = 0.15;

/// Outcomes further than this many standard deviations from the median
/// count as breaking the base answer
pub const BREAKING_DEVIATIONS: f64 = 1.5;

pub const MAX_BREAKING_POINTS: usize = 5;

/// One uncertain input as written in a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSpec {
    /// Point estimate the caller started from; informational only
    #[serde(default)]
    pub value: Option<f64>,
    pub distribution: DistributionKind,
    #[serde(default)]
    pub params: Params,
}

impl AssumptionSpec {
    fn to_assumption(&self, name: &str) -> Assumption {
        Assumption {
            name: name.to_string(),
            distribution: self.distribution,
            params: self.params.clone(),
        }
    }
}

/// Named assumptions in the order the request lists them. The runner
/// samples in this order, so it is part of what a seed reproduces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssumptionMap(Vec<(String, AssumptionSpec)>);

impl AssumptionMap {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&AssumptionSpec> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AssumptionSpec)> {
        self.0.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, AssumptionSpec)> for AssumptionMap {
    fn from_iter<I: IntoIterator<Item = (String, AssumptionSpec)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for AssumptionMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, spec) in &self.0 {
            map.serialize_entry(name, spec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AssumptionMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};

        struct AssumptionMapVisitor;

        impl<'de> Visitor<'de> for AssumptionMapVisitor {
            type Value = AssumptionMap;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a mapping from assumption name to its distribution")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries: Vec<(String, AssumptionSpec)> = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    if entries.iter().any(|(n, _)| *n == name) {
                        return Err(de::Error::custom(format!("duplicate assumption `{name}`")));
                    }
                    let spec = map.next_value()?;
                    entries.push((name, spec));
                }
                Ok(AssumptionMap(entries))
            }
        }

        deserializer.deserialize_map(AssumptionMapVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriteria {
    /// What the outcome measures (revenue, profit, roi, ...)
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
}

impl SuccessCriteria {
    pub fn criterion(&self) -> SuccessCriterion {
        SuccessCriterion::new(self.threshold, self.comparison)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub decision_context: String,
    pub assumptions: AssumptionMap,
    pub success_criteria: SuccessCriteria,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub variable: String,
    pub influence: f64,
    pub contribution: f64,
    pub distribution: DistributionKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateReport {
    pub decision_context: String,
    pub confidence_level: f64,
    pub confidence_qualifier: String,
    pub expected_outcome: f64,
    /// Keyed `P1` .. `P99`
    pub percentiles: BTreeMap<String, f64>,
    pub confidence_interval_95: [f64; 2],
    pub sensitivity_analysis: Vec<Influence>,
    pub key_risk_factors: Vec<RiskFactor>,
    pub num_simulations: usize,
    pub seed: u64,
    pub success_threshold: f64,
    pub statistics: StatisticsSummary,
}

/// `market_size * conversion_rate * price` (or `revenue_per_customer`) when
/// those inputs exist, otherwise the sum of all inputs.
pub fn revenue_outcome(trial: &Trial<'_>) -> f64 {
    if let (Some(market), Some(conversion)) = (trial.get("market_size"), trial.get("conversion_rate"))
        && let Some(unit) = trial.get("price").or_else(|| trial.get("revenue_per_customer"))
    {
        return market * conversion * unit;
    }
    trial.sum()
}

pub(crate) fn percentile_map(summary: &StatisticsSummary) -> BTreeMap<String, f64> {
    summary
        .percentiles
        .iter()
        .map(|(p, v)| (format!("P{p}"), *v))
        .collect()
}

fn summarize(outcomes: &[f64]) -> Result<StatisticsSummary, ToolError> {
    StatisticsAggregator::default()
        .summarize(outcomes)?
        .summary()
        .cloned()
        .ok_or(ToolError::NoData)
}

impl ToolRequest for ValidateRequest {
    type Report = ValidateReport;

    fn apply_overrides(&mut self, seed: Option<u64>, num_simulations: Option<usize>) {
        self.random_seed = seed.or(self.random_seed);
        self.num_simulations = num_simulations.unwrap_or(self.num_simulations);
    }

    fn run(&self, limits: &InputLimits) -> Result<ValidateReport, ToolError> {
        limits.check_text("decision_context", &self.decision_context)?;
        limits.check_assumptions(self.assumptions.len())?;
        limits.check_trials("num_simulations", self.num_simulations)?;

        let assumptions: Vec<Assumption> = self
            .assumptions
            .iter()
            .map(|(name, spec)| spec.to_assumption(name))
            .collect();

        let mut config = SimulationConfig::new(self.num_simulations)
            .with_limits(limits.simulation_limits())
            .with_parallel(true);
        config.random_seed = self.random_seed;

        let run = simulate(&assumptions, None, &config, |t| {
            Ok::<_, std::convert::Infallible>(revenue_outcome(t))
        })?;

        let criterion = self.success_criteria.criterion();
        let level = confidence_level(&run.outcomes, &criterion).ok_or(ToolError::NoData)?;
        let statistics = summarize(&run.outcomes)?;
        let sensitivity = analyze(&run.samples, &run.outcomes, SensitivityMethod::Spearman)?;

        let key_risk_factors = sensitivity
            .entries
            .iter()
            .filter(|e| e.contribution > KEY_RISK_THRESHOLD)
            .filter_map(|e| {
                let spec = self.assumptions.get(&e.assumption)?;
                Some(RiskFactor {
                    variable: e.assumption.clone(),
                    influence: e.influence,
                    contribution: e.contribution,
                    distribution: spec.distribution,
                    description: format!(
                        "{} explains {:.1}% of outcome variance",
                        e.assumption,
                        e.contribution * 100.0
                    ),
                })
            })
            .collect();

        tracing::info!(
            confidence = level,
            seed = run.seed,
            trials = run.num_simulations,
            "validated reasoning confidence"
        );

        Ok(ValidateReport {
            decision_context: self.decision_context.clone(),
            confidence_level: level,
            confidence_qualifier: confidence_qualifier(level).to_string(),
            expected_outcome: statistics.mean,
            percentiles: percentile_map(&statistics),
            confidence_interval_95: [
                statistics.confidence_interval.low,
                statistics.confidence_interval.high,
            ],
            sensitivity_analysis: sensitivity.entries,
            key_risk_factors,
            num_simulations: run.num_simulations,
            seed: run.seed,
            success_threshold: criterion.threshold,
            statistics,
        })
    }
}

/// A named assumption in the robustness request's list form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAssumption {
    pub name: String,
    pub distribution: DistributionKind,
    #[serde(default)]
    pub params: Params,
}

impl From<&NamedAssumption> for Assumption {
    fn from(a: &NamedAssumption) -> Self {
        Assumption {
            name: a.name.clone(),
            distribution: a.distribution,
            params: a.params.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessRequest {
    pub base_answer: String,
    pub critical_assumptions: Vec<NamedAssumption>,
    #[serde(default = "default_num_scenarios")]
    pub num_scenarios: usize,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakingPoint {
    pub scenario: BTreeMap<String, f64>,
    pub outcome: f64,
    pub deviation_from_base: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestSummary {
    pub stable_scenarios: usize,
    pub unstable_scenarios: usize,
    pub outcome_range: [f64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub base_answer: String,
    /// Median outcome, taken as where the base answer sits
    pub base_outcome: f64,
    pub robustness_score: f64,
    pub robustness_qualifier: String,
    pub breaking_points: Vec<BreakingPoint>,
    pub num_scenarios_tested: usize,
    pub seed: u64,
    pub stress_test_summary: StressTestSummary,
}

impl ToolRequest for RobustnessRequest {
    type Report = RobustnessReport;

    fn apply_overrides(&mut self, seed: Option<u64>, num_simulations: Option<usize>) {
        self.random_seed = seed.or(self.random_seed);
        self.num_scenarios = num_simulations.unwrap_or(self.num_scenarios);
    }

    fn run(&self, limits: &InputLimits) -> Result<RobustnessReport, ToolError> {
        limits.check_text("base_answer", &self.base_answer)?;
        limits.check_assumptions(self.critical_assumptions.len())?;
        limits.check_trials("num_scenarios", self.num_scenarios)?;

        let assumptions: Vec<Assumption> = self
            .critical_assumptions
            .iter()
            .map(Assumption::from)
            .collect();

        let mut config = SimulationConfig::new(self.num_scenarios)
            .with_limits(limits.simulation_limits());
        config.random_seed = self.random_seed;

        let run = simulate(&assumptions, None, &config, |t| {
            Ok::<_, std::convert::Infallible>(t.sum())
        })?;
        let statistics = summarize(&run.outcomes)?;

        let base = statistics.median;
        let tolerance = statistics.std * BREAKING_DEVIATIONS;
        let breaking: Vec<usize> = run
            .outcomes
            .iter()
            .enumerate()
            .filter(|(_, v)| (*v - base).abs() > tolerance)
            .map(|(i, _)| i)
            .collect();

        let breaking_points = breaking
            .iter()
            .take(MAX_BREAKING_POINTS)
            .map(|&i| {
                let scenario = run
                    .samples
                    .iter()
                    .map(|(name, values)| (name.to_string(), values[i]))
                    .collect();
                BreakingPoint {
                    scenario,
                    outcome: run.outcomes[i],
                    deviation_from_base: run.outcomes[i] - base,
                }
            })
            .collect();

        let total = run.outcomes.len();
        let score = 1.0 - breaking.len() as f64 / total as f64;

        tracing::info!(
            score,
            unstable = breaking.len(),
            seed = run.seed,
            "tested assumption robustness"
        );

        Ok(RobustnessReport {
            base_answer: self.base_answer.clone(),
            base_outcome: base,
            robustness_score: score,
            robustness_qualifier: robustness_qualifier(score).to_string(),
            breaking_points,
            num_scenarios_tested: total,
            seed: run.seed,
            stress_test_summary: StressTestSummary {
                stable_scenarios: total - breaking.len(),
                unstable_scenarios: breaking.len(),
                outcome_range: [statistics.min, statistics.max],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parse_request;

    const VALIDATE_YAML: &str = r#"
decision_context: "Launch the premium tier"
assumptions:
  market_size:
    distribution: normal
    params: { mean: 100000.0, std: 10000.0 }
  conversion_rate:
    distribution: uniform
    params: { min: 0.01, max: 0.03 }
  price:
    value: 50.0
    distribution: triangular
    params: { low: 40.0, mode: 50.0, high: 60.0 }
success_criteria:
  metric: revenue
  threshold: 80000.0
  comparison: ">="
num_simulations: 5000
random_seed: 42
"#;

    #[test]
    fn test_validate_revenue_model() {
        let request: ValidateRequest = parse_request(VALIDATE_YAML).unwrap();
        let report = request.run(&InputLimits::default()).unwrap();

        // E[revenue] ≈ 100000 * 0.02 * 50
        assert!((report.expected_outcome - 100_000.0).abs() < 5_000.0);
        assert!(report.confidence_level > 0.6 && report.confidence_level < 0.85);
        assert_eq!(report.seed, 42);
        assert_eq!(report.percentiles.len(), 9);
        assert!(report.percentiles.contains_key("P50"));
        assert!(report.confidence_interval_95[0] < report.confidence_interval_95[1]);

        // Conversion rate has by far the widest relative spread
        assert_eq!(report.sensitivity_analysis[0].assumption, "conversion_rate");
        assert_eq!(report.key_risk_factors[0].variable, "conversion_rate");
        assert_eq!(report.key_risk_factors[0].distribution, DistributionKind::Uniform);
    }

    #[test]
    fn test_validate_is_reproducible() {
        let request: ValidateRequest = parse_request(VALIDATE_YAML).unwrap();
        let a = request.run(&InputLimits::default()).unwrap();
        let b = request.run(&InputLimits::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_limits() {
        let mut request: ValidateRequest = parse_request(VALIDATE_YAML).unwrap();
        request.decision_context = "x".repeat(501);
        assert!(matches!(
            request.run(&InputLimits::default()),
            Err(ToolError::TextTooLong { .. })
        ));

        let mut request: ValidateRequest = parse_request(VALIDATE_YAML).unwrap();
        request.apply_overrides(None, Some(0));
        assert!(matches!(
            request.run(&InputLimits::default()),
            Err(ToolError::TrialCount { .. })
        ));
    }

    #[test]
    fn test_assumptions_keep_request_order() {
        let mut request: ValidateRequest = parse_request(VALIDATE_YAML).unwrap();
        request.apply_overrides(None, Some(200));
        let names: Vec<&str> = request.assumptions.names().collect();
        assert_eq!(names, vec!["market_size", "conversion_rate", "price"]);

        // Sampling follows the listed order, not the alphabetical one
        let config = SimulationConfig::new(200).with_seed(42);
        let listed: Vec<Assumption> = request
            .assumptions
            .iter()
            .map(|(name, spec)| spec.to_assumption(name))
            .collect();
        let run = simulate(&listed, None, &config, |t| {
            Ok::<_, std::convert::Infallible>(revenue_outcome(t))
        })
        .unwrap();
        let report = request.run(&InputLimits::default()).unwrap();
        let stats = StatisticsAggregator::default().summarize(&run.outcomes).unwrap();
        assert_eq!(report.expected_outcome, stats.summary().unwrap().mean);

        let json = serde_json::to_string(&request.assumptions).unwrap();
        assert!(json.find("market_size").unwrap() < json.find("conversion_rate").unwrap());
    }

    #[test]
    fn test_duplicate_assumption_rejected() {
        let yaml = VALIDATE_YAML.replace("  price:", "  market_size:");
        assert!(parse_request::<ValidateRequest>(&yaml).is_err());
    }

    #[test]
    fn test_unknown_comparison_rejected() {
        let yaml = VALIDATE_YAML.replace("\">=\"", "\"==\"");
        assert!(parse_request::<ValidateRequest>(&yaml).is_err());
    }

    #[test]
    fn test_outcome_model_selection() {
        let config = SimulationConfig::new(3).with_seed(1);
        let outcomes = |assumptions: &[Assumption]| {
            simulate(assumptions, None, &config, |t| {
                Ok::<_, std::convert::Infallible>(revenue_outcome(t))
            })
            .unwrap()
            .outcomes
        };

        let generic = [Assumption::normal("a", 2.0, 0.0), Assumption::normal("b", 3.0, 0.0)];
        assert_eq!(outcomes(&generic), vec![5.0; 3]);

        let per_customer = [
            Assumption::normal("market_size", 10.0, 0.0),
            Assumption::normal("conversion_rate", 0.5, 0.0),
            Assumption::normal("revenue_per_customer", 4.0, 0.0),
        ];
        assert_eq!(outcomes(&per_customer), vec![20.0; 3]);

        // Without a unit value the model falls back to the sum
        let partial = [
            Assumption::normal("market_size", 10.0, 0.0),
            Assumption::normal("conversion_rate", 0.5, 0.0),
        ];
        assert_eq!(outcomes(&partial), vec![10.5; 3]);
    }

    #[test]
    fn test_robustness() {
        let yaml = r#"
base_answer: "Hire two engineers"
critical_assumptions:
  - name: velocity_gain
    distribution: normal
    params: { mean: 0.3, std: 0.1 }
  - name: ramp_up_cost
    distribution: uniform
    params: { low: -0.2, high: 0.0 }
num_scenarios: 2000
random_seed: 9
"#;
        let request: RobustnessRequest = parse_request(yaml).unwrap();
        let report = request.run(&InputLimits::default()).unwrap();

        // Roughly 13% of a near-normal outcome lies beyond 1.5 sigma
        assert!(report.robustness_score > 0.8 && report.robustness_score < 0.92);
        assert_eq!(report.breaking_points.len(), MAX_BREAKING_POINTS);
        assert_eq!(
            report.stress_test_summary.stable_scenarios + report.stress_test_summary.unstable_scenarios,
            2000
        );
        for point in &report.breaking_points {
            let sum: f64 = point.scenario.values().sum();
            assert!((sum - point.outcome).abs() < 1e-12);
            assert!(point.deviation_from_base.abs() > 0.0);
        }
    }
}
