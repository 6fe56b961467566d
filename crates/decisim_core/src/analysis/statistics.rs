//! Summary statistics over outcome vectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::model::SampleSet;

/// Percentile levels reported when the caller doesn't ask for specific ones
pub const DEFAULT_PERCENTILES: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

const LEVEL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Coverage in (0, 1), e.g. 0.95
    pub level: f64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub variance: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub skewness: f64,
    /// Excess kurtosis (normal = 0)
    pub kurtosis: f64,
    /// (level in 0-100, value), in the order requested
    pub percentiles: Vec<(f64, f64)>,
    pub confidence_interval: ConfidenceInterval,
}

impl StatisticsSummary {
    /// Value at a requested percentile level, if it was computed
    #[must_use]
    pub fn percentile(&self, level: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(p, _)| (p - level).abs() < LEVEL_TOLERANCE)
            .map(|(_, v)| *v)
    }
}

/// Result of aggregating an outcome vector. Zero trials is not an error here:
/// it yields `NoData` and the caller decides how to surface it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Statistics {
    NoData,
    Summary(StatisticsSummary),
}

impl Statistics {
    #[must_use]
    pub fn summary(&self) -> Option<&StatisticsSummary> {
        match self {
            Self::NoData => None,
            Self::Summary(s) => Some(s),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Reject percentile levels outside `[0, 100]`
pub fn validate_level(level: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&level) {
        return Err(SimulationError::invalid_parameter(
            "percentile",
            format!("level must be in [0, 100], got {level}"),
        ));
    }
    Ok(())
}

// `total_cmp` orders NaN and infinities at the ends, so the endpoints
// of a sorted slice decide finiteness for the whole of it
fn ensure_finite(sorted: &[f64]) -> Result<()> {
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) if !first.is_finite() || !last.is_finite() => {
            Err(SimulationError::invalid_parameter(
                "statistics",
                format!("values must be finite, got {}", if first.is_finite() { last } else { first }),
            ))
        }
        _ => Ok(()),
    }
}

/// Linear interpolation between order statistics of an ascending slice.
///
/// Returns `None` for an empty slice. Non-finite values are rejected.
pub fn percentile(sorted: &[f64], level: f64) -> Result<Option<f64>> {
    validate_level(level)?;
    ensure_finite(sorted)?;
    let Some(&last) = sorted.last() else {
        return Ok(None);
    };
    if sorted.len() == 1 {
        return Ok(Some(last));
    }

    let rank = level / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi]);
    // Clamped so rounding never breaks monotonicity in the level
    let value = (a + (b - a) * (rank - lo as f64)).clamp(a, b);
    Ok(Some(value))
}

/// `[P((1-c)/2), P((1+c)/2)]` of an ascending slice
pub fn confidence_interval(sorted: &[f64], level: f64) -> Result<Option<ConfidenceInterval>> {
    if !(0.0..=1.0).contains(&level) {
        return Err(SimulationError::invalid_parameter(
            "confidence interval",
            format!("level must be in [0, 1], got {level}"),
        ));
    }
    let low = percentile(sorted, (1.0 - level) / 2.0 * 100.0)?;
    let high = percentile(sorted, (1.0 + level) / 2.0 * 100.0)?;
    Ok(low.zip(high).map(|(low, high)| ConfidenceInterval { level, low, high }))
}

/// Reduces outcome vectors to [`Statistics`] for a fixed set of percentile
/// levels and a confidence level. Both are validated up front.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsAggregator {
    percentiles: Vec<f64>,
    confidence_level: f64,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self {
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl StatisticsAggregator {
    pub fn new(percentiles: Vec<f64>, confidence_level: f64) -> Result<Self> {
        for &p in &percentiles {
            validate_level(p)?;
        }
        if !(0.0..=1.0).contains(&confidence_level) {
            return Err(SimulationError::invalid_parameter(
                "confidence interval",
                format!("level must be in [0, 1], got {confidence_level}"),
            ));
        }
        Ok(Self {
            percentiles,
            confidence_level,
        })
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn summarize(&self, outcomes: &[f64]) -> Result<Statistics> {
        if outcomes.is_empty() {
            return Ok(Statistics::NoData);
        }

        let mut sorted = outcomes.to_vec();
        sorted.sort_by(f64::total_cmp);
        ensure_finite(&sorted)?;

        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let (m2, m3, m4) = sorted.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), &x| {
            let d = x - mean;
            let d2 = d * d;
            (m2 + d2, m3 + d2 * d, m4 + d2 * d2)
        });
        let variance = m2 / n;
        let std = variance.sqrt();

        // Constant data has no shape; report zero rather than NaN
        let (skewness, kurtosis) = if variance > 0.0 {
            (
                (m3 / n) / variance.powf(1.5),
                (m4 / n) / (variance * variance) - 3.0,
            )
        } else {
            (0.0, 0.0)
        };

        let at = |level: f64| -> Result<f64> {
            Ok(percentile(&sorted, level)?.unwrap_or(mean))
        };

        let percentiles = self
            .percentiles
            .iter()
            .map(|&p| Ok((p, at(p)?)))
            .collect::<Result<Vec<_>>>()?;

        let c = self.confidence_level;
        let confidence_interval = ConfidenceInterval {
            level: c,
            low: at((1.0 - c) / 2.0 * 100.0)?,
            high: at((1.0 + c) / 2.0 * 100.0)?,
        };

        Ok(Statistics::Summary(StatisticsSummary {
            count: sorted.len(),
            mean,
            std,
            variance,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: at(50.0)?,
            skewness,
            kurtosis,
            percentiles,
            confidence_interval,
        }))
    }

    /// Per-assumption statistics, keyed by name
    pub fn summarize_samples(&self, samples: &SampleSet) -> Result<BTreeMap<String, Statistics>> {
        samples
            .iter()
            .map(|(name, values)| Ok((name.to_string(), self.summarize(values)?)))
            .collect()
    }
}
