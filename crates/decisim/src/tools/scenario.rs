//! Business scenario tools: multi-period profitability under uncertain growth
//! and cost, and tornado ranking from caller-supplied low/high ranges.

use std::collections::BTreeMap;

use decisim_core::analysis::{
    Comparison, Influence, PerturbationRange, SensitivityMethod, StatisticsSummary, SuccessCriterion,
    TornadoResult, analyze, confidence_level, perturbation_sensitivity,
};
use decisim_core::{Assumption, CorrelationMatrix, SimulationConfig, Trial, simulate};
use serde::{Deserialize, Serialize};

use super::confidence::percentile_map;
use super::{ToolRequest, default_num_simulations};
use crate::request::{InputLimits, ToolError};

pub const GROWTH_RATE: &str = "growth_rate";
pub const VARIABLE_COST: &str = "variable_cost_pct";
pub const CHURN_RATE: &str = "churn_rate";

pub const KEY_DRIVER_COUNT: usize = 3;

/// Mean and spread of a normally distributed rate; missing fields fall back
/// to per-rate defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSpec {
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub std: Option<f64>,
}

impl RateSpec {
    fn assumption(&self, name: &str, mean: f64, std: f64) -> Assumption {
        Assumption::normal(name, self.mean.unwrap_or(mean), self.std.unwrap_or(std))
    }
}

fn default_base_revenue() -> f64 {
    100_000.0
}

fn default_fixed_costs() -> f64 {
    50_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAssumptions {
    #[serde(default = "default_base_revenue")]
    pub base_revenue: f64,
    #[serde(default)]
    pub growth_rate: Option<RateSpec>,
    #[serde(default)]
    pub churn_rate: Option<RateSpec>,
    #[serde(default)]
    pub initial_investment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStructure {
    #[serde(default = "default_fixed_costs")]
    pub fixed_costs: f64,
    /// Variable cost as a share of revenue
    #[serde(default)]
    pub variable_costs: Option<RateSpec>,
    /// Correlation between growth and the variable cost share, in [-1, 1]
    #[serde(default)]
    pub correlation_to_revenue: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRequest {
    pub scenario_name: String,
    pub revenue_assumptions: RevenueAssumptions,
    pub cost_structure: CostStructure,
    /// Number of compounding periods
    pub time_horizon: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: usize,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileOutcomes {
    pub pessimistic_p10: f64,
    pub most_likely_p50: f64,
    pub optimistic_p90: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub downside_risk: f64,
    pub upside_potential: f64,
    pub outcome_range: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiAnalysis {
    pub mean_roi: f64,
    pub median_roi: f64,
    pub prob_positive_roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub time_horizon: u32,
    pub expected_total_profit: f64,
    pub probability_of_profitability: f64,
    pub percentile_outcomes: PercentileOutcomes,
    pub percentiles: BTreeMap<String, f64>,
    pub risk_metrics: RiskMetrics,
    pub roi_analysis: Option<RoiAnalysis>,
    pub statistics: StatisticsSummary,
    pub sensitivity: Vec<Influence>,
    /// One-at-a-time swing of each rate between its P10 and P90
    pub tornado: TornadoResult,
    pub correlated: bool,
    pub num_simulations: usize,
    pub seed: u64,
    pub interpretation: String,
}

/// Total profit over `periods`, compounding revenue by growth and churn
/// each period before subtracting fixed and variable costs.
fn total_profit(
    base_revenue: f64,
    fixed_costs: f64,
    periods: u32,
    growth: f64,
    variable_cost: f64,
    churn: f64,
) -> f64 {
    let mut revenue = base_revenue;
    let mut total = 0.0;
    for _ in 0..periods {
        revenue *= (1.0 + growth) * (1.0 - churn);
        total += revenue - fixed_costs - revenue * variable_cost;
    }
    total
}

impl ScenarioRequest {
    fn assumptions(&self) -> Vec<Assumption> {
        let revenue = &self.revenue_assumptions;
        [
            revenue.growth_rate.map(|g| g.assumption(GROWTH_RATE, 0.05, 0.02)),
            self.cost_structure
                .variable_costs
                .map(|v| v.assumption(VARIABLE_COST, 0.5, 0.1)),
            revenue.churn_rate.map(|c| c.assumption(CHURN_RATE, 0.1, 0.03)),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn correlation(&self, assumptions: &[Assumption]) -> Result<Option<CorrelationMatrix>, ToolError> {
        let Some(rho) = self.cost_structure.correlation_to_revenue else {
            return Ok(None);
        };
        let names: Vec<String> = assumptions.iter().map(|a| a.name.clone()).collect();
        let has = |n: &str| names.iter().any(|m| m == n);
        if rho == 0.0 || !has(GROWTH_RATE) || !has(VARIABLE_COST) {
            return Ok(None);
        }
        Ok(Some(CorrelationMatrix::from_pairs(
            names,
            [(GROWTH_RATE, VARIABLE_COST, rho)],
        )?))
    }

    fn outcome(&self, trial: &Trial<'_>) -> f64 {
        total_profit(
            self.revenue_assumptions.base_revenue,
            self.cost_structure.fixed_costs,
            self.time_horizon,
            trial.get(GROWTH_RATE).unwrap_or(0.05),
            trial.get(VARIABLE_COST).unwrap_or(0.5),
            trial.get(CHURN_RATE).unwrap_or(0.0),
        )
    }
}

fn interpret(profit_probability: f64, expected_profit: f64, roi: Option<&RoiAnalysis>) -> String {
    let strength = if profit_probability >= 0.8 {
        "HIGH"
    } else if profit_probability >= 0.6 {
        "MODERATE"
    } else {
        "LOW"
    };
    let mut parts = vec![format!(
        "{strength} probability ({:.0}%) of profitability",
        profit_probability * 100.0
    )];

    if expected_profit > 0.0 {
        parts.push(format!("with expected profit of {}", format_currency(expected_profit)));
    } else {
        parts.push(format!("with expected LOSS of {}", format_currency(expected_profit.abs())));
    }

    if let Some(roi) = roi {
        let p = roi.prob_positive_roi;
        let label = if p >= 0.7 { "Strong" } else { "Limited" };
        parts.push(format!("{label} ROI potential ({:.0}% prob)", p * 100.0));
    }
    parts.join(". ")
}

/// `$1,234,568` style, rounded to whole units
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

impl ToolRequest for ScenarioRequest {
    type Report = ScenarioReport;

    fn apply_overrides(&mut self, seed: Option<u64>, num_simulations: Option<usize>) {
        self.random_seed = seed.or(self.random_seed);
        self.num_simulations = num_simulations.unwrap_or(self.num_simulations);
    }

    fn run(&self, limits: &InputLimits) -> Result<ScenarioReport, ToolError> {
        limits.check_text("scenario_name", &self.scenario_name)?;
        limits.check_trials("num_simulations", self.num_simulations)?;
        if self.time_horizon == 0 {
            return Err(ToolError::InvalidInput(
                "time_horizon must be positive, got 0".to_string(),
            ));
        }
        if let Some(investment) = self.revenue_assumptions.initial_investment
            && investment <= 0.0
        {
            return Err(ToolError::InvalidInput(format!(
                "initial_investment must be positive, got {investment}"
            )));
        }

        let assumptions = self.assumptions();
        let correlation = self.correlation(&assumptions)?;

        let mut config = SimulationConfig::new(self.num_simulations)
            .with_limits(limits.simulation_limits())
            .with_parallel(true);
        config.random_seed = self.random_seed;

        let outcome = |t: &Trial<'_>| Ok::<_, std::convert::Infallible>(self.outcome(t));
        let run = simulate(&assumptions, correlation.as_ref(), &config, outcome)?;

        let statistics = decisim_core::analysis::StatisticsAggregator::default()
            .summarize(&run.outcomes)?
            .summary()
            .cloned()
            .ok_or(ToolError::NoData)?;
        let at = |level: f64| statistics.percentile(level).unwrap_or(statistics.median);
        let (p10, p50, p90) = (at(10.0), at(50.0), at(90.0));

        let profit_probability =
            confidence_level(&run.outcomes, &SuccessCriterion::new(0.0, Comparison::Above))
                .ok_or(ToolError::NoData)?;

        let roi_analysis = self.revenue_assumptions.initial_investment.map(|investment| {
            let roi: Vec<f64> = run
                .outcomes
                .iter()
                .map(|v| (v - investment) / investment)
                .collect();
            let mut sorted = roi.clone();
            sorted.sort_by(f64::total_cmp);
            let positive = roi.iter().filter(|r| **r > 0.0).count();
            RoiAnalysis {
                mean_roi: roi.iter().sum::<f64>() / roi.len() as f64,
                median_roi: decisim_core::analysis::percentile(&sorted, 50.0)
                    .ok()
                    .flatten()
                    .unwrap_or(0.0),
                prob_positive_roi: positive as f64 / roi.len() as f64,
            }
        });

        let sensitivity = analyze(&run.samples, &run.outcomes, SensitivityMethod::Spearman)?;
        let tornado = perturbation_sensitivity(&assumptions, PerturbationRange::default(), outcome)?;
        let interpretation = interpret(profit_probability, statistics.mean, roi_analysis.as_ref());

        tracing::info!(
            scenario = %self.scenario_name,
            profit_probability,
            seed = run.seed,
            correlated = run.correlated,
            "ran business scenario"
        );

        Ok(ScenarioReport {
            scenario_name: self.scenario_name.clone(),
            time_horizon: self.time_horizon,
            expected_total_profit: statistics.mean,
            probability_of_profitability: profit_probability,
            percentile_outcomes: PercentileOutcomes {
                pessimistic_p10: p10,
                most_likely_p50: p50,
                optimistic_p90: p90,
            },
            percentiles: percentile_map(&statistics),
            risk_metrics: RiskMetrics {
                downside_risk: p10,
                upside_potential: p90,
                outcome_range: p90 - p10,
            },
            roi_analysis,
            sensitivity: sensitivity.entries,
            tornado,
            correlated: run.correlated,
            num_simulations: run.num_simulations,
            seed: run.seed,
            interpretation,
            statistics,
        })
    }
}

/// Low/high outcome values for one variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationRange {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoRequest {
    pub base_simulation_id: String,
    pub variables_to_test: Vec<String>,
    pub variation_range: BTreeMap<String, VariationRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoBar {
    pub variable: String,
    pub low_value: f64,
    pub high_value: f64,
    /// `high - low`
    pub variance: f64,
    /// `|high - low|`
    pub impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TornadoReport {
    pub base_simulation_id: String,
    pub tornado_diagram_data: Vec<TornadoBar>,
    pub key_drivers: Vec<String>,
    pub num_variables_tested: usize,
    /// Requested variables without a complete low/high range
    pub skipped: Vec<String>,
    pub interpretation: String,
}

impl ToolRequest for TornadoRequest {
    type Report = TornadoReport;

    fn apply_overrides(&mut self, _seed: Option<u64>, _num_simulations: Option<usize>) {}

    fn run(&self, limits: &InputLimits) -> Result<TornadoReport, ToolError> {
        limits.check_text("base_simulation_id", &self.base_simulation_id)?;
        limits.check_assumptions(self.variables_to_test.len())?;

        let mut bars = Vec::with_capacity(self.variables_to_test.len());
        let mut skipped = Vec::new();
        for name in &self.variables_to_test {
            match self.variation_range.get(name) {
                Some(VariationRange {
                    low: Some(low),
                    high: Some(high),
                }) => bars.push(TornadoBar {
                    variable: name.clone(),
                    low_value: *low,
                    high_value: *high,
                    variance: high - low,
                    impact: (high - low).abs(),
                }),
                _ => skipped.push(name.clone()),
            }
        }

        bars.sort_by(|a, b| {
            b.impact
                .total_cmp(&a.impact)
                .then_with(|| a.variable.cmp(&b.variable))
        });

        let key_drivers: Vec<String> = bars
            .iter()
            .take(KEY_DRIVER_COUNT)
            .map(|b| b.variable.clone())
            .collect();
        if !skipped.is_empty() {
            tracing::warn!(?skipped, "variables without a low/high range were skipped");
        }

        Ok(TornadoReport {
            base_simulation_id: self.base_simulation_id.clone(),
            interpretation: format!("Top drivers: {}", key_drivers.join(", ")),
            tornado_diagram_data: bars,
            key_drivers,
            num_variables_tested: self.variables_to_test.len(),
            skipped,
        })
    }
}
