//! Success criteria and the label tables used to describe confidence and
//! robustness to a human reader.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// How an outcome is compared against a threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[default]
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    Below,
}

impl Comparison {
    pub const ALL: [Comparison; 4] = [Self::AtLeast, Self::Above, Self::AtMost, Self::Below];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::Above => ">",
            Self::AtMost => "<=",
            Self::Below => "<",
        }
    }

    #[must_use]
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::AtLeast => value >= threshold,
            Self::Above => value > threshold,
            Self::AtMost => value <= threshold,
            Self::Below => value < threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparison {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                SimulationError::invalid_parameter(
                    "success criterion",
                    format!("unknown comparison `{s}` (expected >=, >, <= or <)"),
                )
            })
    }
}

/// "The decision succeeds when the outcome `comparison` `threshold`"
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessCriterion {
    pub threshold: f64,
    #[serde(default)]
    pub comparison: Comparison,
}

impl SuccessCriterion {
    #[must_use]
    pub fn new(threshold: f64, comparison: Comparison) -> Self {
        Self {
            threshold,
            comparison,
        }
    }

    #[must_use]
    pub fn at_least(threshold: f64) -> Self {
        Self::new(threshold, Comparison::AtLeast)
    }

    #[must_use]
    pub fn is_met(&self, outcome: f64) -> bool {
        self.comparison.holds(outcome, self.threshold)
    }
}

/// Fraction of outcomes meeting the criterion; `None` when there are none.
#[must_use]
pub fn confidence_level(outcomes: &[f64], criterion: &SuccessCriterion) -> Option<f64> {
    if outcomes.is_empty() {
        return None;
    }
    let hits = outcomes.iter().filter(|&&v| criterion.is_met(v)).count();
    Some(hits as f64 / outcomes.len() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceQualifier {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ConfidenceQualifier {
    /// Lower bounds, checked top-down; anything below the last is `VeryLow`
    pub const TABLE: [(f64, ConfidenceQualifier); 4] = [
        (0.90, Self::VeryHigh),
        (0.75, Self::High),
        (0.60, Self::Moderate),
        (0.40, Self::Low),
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryHigh => "VERY HIGH",
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
            Self::VeryLow => "VERY LOW",
        }
    }
}

impl fmt::Display for ConfidenceQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[must_use]
pub fn confidence_qualifier(level: f64) -> ConfidenceQualifier {
    ConfidenceQualifier::TABLE
        .iter()
        .find(|(bound, _)| level >= *bound)
        .map_or(ConfidenceQualifier::VeryLow, |(_, q)| *q)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobustnessQualifier {
    Fragile,
    SomewhatFragile,
    ModeratelyRobust,
    Robust,
}

impl RobustnessQualifier {
    pub const TABLE: [(f64, RobustnessQualifier); 3] = [
        (0.90, Self::Robust),
        (0.75, Self::ModeratelyRobust),
        (0.50, Self::SomewhatFragile),
    ];

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Robust => "ROBUST",
            Self::ModeratelyRobust => "MODERATELY ROBUST",
            Self::SomewhatFragile => "SOMEWHAT FRAGILE",
            Self::Fragile => "FRAGILE",
        }
    }
}

impl fmt::Display for RobustnessQualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[must_use]
pub fn robustness_qualifier(score: f64) -> RobustnessQualifier {
    RobustnessQualifier::TABLE
        .iter()
        .find(|(bound, _)| score >= *bound)
        .map_or(RobustnessQualifier::Fragile, |(_, q)| *q)
}
