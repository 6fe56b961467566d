//! Request files loaded from disk and run end to end

use std::io::Write;

use decisim::tools::{RobustnessRequest, ScenarioRequest, TornadoRequest, ValidateRequest};
use decisim::{InputLimits, ToolError, ToolRequest, load_request};
use tempfile::NamedTempFile;

fn write_request(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_validate_from_file_with_overrides() {
    let file = write_request(
        r#"
decision_context: "Is the new pricing worth it?"
assumptions:
  roi:
    distribution: normal
    params: { mean: 0.15, std: 0.05 }
success_criteria:
  threshold: 0.10
  comparison: ">="
"#,
    );

    let mut request: ValidateRequest = load_request(file.path()).unwrap();
    assert_eq!(request.num_simulations, 10_000);
    assert_eq!(request.random_seed, None);

    request.apply_overrides(Some(42), Some(1_000));
    let report = request.run(&InputLimits::default()).unwrap();

    assert_eq!(report.seed, 42);
    assert_eq!(report.num_simulations, 1_000);
    assert!((report.confidence_level - 0.841).abs() < 0.02);
    assert_eq!(report.confidence_qualifier, "HIGH");

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["percentiles"]["P50"].is_number());
    assert_eq!(json["sensitivity_analysis"][0]["direction"], "positive");
}

#[test]
fn test_unsupported_distribution_is_reported() {
    let file = write_request(
        r#"
decision_context: "Exotic input"
assumptions:
  x:
    distribution: cauchy
    params: { location: 0.0 }
success_criteria:
  threshold: 0.0
"#,
    );
    let err = load_request::<ValidateRequest>(file.path()).unwrap_err();
    assert!(matches!(err, ToolError::Parse(_)));
}

#[test]
fn test_invalid_parameters_fail_before_sampling() {
    let file = write_request(
        r#"
base_answer: "Ship it"
critical_assumptions:
  - name: effort
    distribution: triangular
    params: { low: 5.0, mode: 1.0, high: 10.0 }
random_seed: 1
"#,
    );
    let request: RobustnessRequest = load_request(file.path()).unwrap();
    let err = request.run(&InputLimits::default()).unwrap_err();
    assert!(matches!(
        err,
        ToolError::Simulation(decisim_core::SimulationError::InvalidParameter { .. })
    ));
}

#[test]
fn test_scenario_and_tornado_files() {
    let scenario = write_request(
        r#"
scenario_name: "Steady state"
revenue_assumptions:
  growth_rate: { mean: 0.03 }
cost_structure:
  fixed_costs: 20000.0
  variable_costs: { mean: 0.4, std: 0.05 }
time_horizon: 3
num_simulations: 2000
random_seed: 5
"#,
    );
    let request: ScenarioRequest = load_request(scenario.path()).unwrap();
    let report = request.run(&InputLimits::default()).unwrap();
    // Default base revenue of 100000 grown at 3% for three periods, 60% margin
    assert!((report.expected_total_profit - 131_000.0).abs() < 5_000.0);
    assert!(report.probability_of_profitability > 0.99);

    let tornado = write_request(
        r#"
base_simulation_id: "steady"
variables_to_test: [growth_rate, variable_cost_pct]
variation_range:
  growth_rate: { low: 0.01, high: 0.05 }
  variable_cost_pct: { low: 0.3, high: 0.5 }
"#,
    );
    let request: TornadoRequest = load_request(tornado.path()).unwrap();
    let report = request.run(&InputLimits::default()).unwrap();
    assert_eq!(report.key_drivers, vec!["variable_cost_pct", "growth_rate"]);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_request::<TornadoRequest>(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ToolError::Io { .. }));
}
