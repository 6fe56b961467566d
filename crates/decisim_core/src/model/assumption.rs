//! Uncertain inputs and the closed set of distribution kinds they may use.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::distribution::Distribution;
use crate::error::{Result, SimulationError};

/// Distribution-specific parameters keyed by parameter name (e.g. `mean`, `std`)
pub type Params = BTreeMap<String, f64>;

/// Supported distribution families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistributionKind {
    Normal,
    LogNormal,
    Uniform,
    Triangular,
    Exponential,
    Beta,
    Gamma,
}

impl DistributionKind {
    pub const ALL: [DistributionKind; 7] = [
        DistributionKind::Normal,
        DistributionKind::LogNormal,
        DistributionKind::Uniform,
        DistributionKind::Triangular,
        DistributionKind::Exponential,
        DistributionKind::Beta,
        DistributionKind::Gamma,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionKind::Normal => "normal",
            DistributionKind::LogNormal => "lognormal",
            DistributionKind::Uniform => "uniform",
            DistributionKind::Triangular => "triangular",
            DistributionKind::Exponential => "exponential",
            DistributionKind::Beta => "beta",
            DistributionKind::Gamma => "gamma",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        DistributionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| SimulationError::InvalidDistribution(s.to_string()))
    }
}

impl TryFrom<String> for DistributionKind {
    type Error = SimulationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DistributionKind> for String {
    fn from(kind: DistributionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One uncertain input: a unique name, a distribution kind and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumption {
    pub name: String,
    pub distribution: DistributionKind,
    #[serde(default)]
    pub params: Params,
}

impl Assumption {
    pub fn new<'a>(
        name: impl Into<String>,
        distribution: DistributionKind,
        params: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Self {
        Self {
            name: name.into(),
            distribution,
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn normal(name: impl Into<String>, mean: f64, std: f64) -> Self {
        Self::new(name, DistributionKind::Normal, [("mean", mean), ("std", std)])
    }

    /// `mean` and `sigma` describe the underlying normal
    pub fn lognormal(name: impl Into<String>, mean: f64, sigma: f64) -> Self {
        Self::new(
            name,
            DistributionKind::LogNormal,
            [("mean", mean), ("sigma", sigma)],
        )
    }

    pub fn uniform(name: impl Into<String>, low: f64, high: f64) -> Self {
        Self::new(
            name,
            DistributionKind::Uniform,
            [("low", low), ("high", high)],
        )
    }

    pub fn triangular(name: impl Into<String>, low: f64, mode: f64, high: f64) -> Self {
        Self::new(
            name,
            DistributionKind::Triangular,
            [("low", low), ("mode", mode), ("high", high)],
        )
    }

    pub fn exponential(name: impl Into<String>, rate: f64) -> Self {
        Self::new(name, DistributionKind::Exponential, [("rate", rate)])
    }

    pub fn beta(name: impl Into<String>, a: f64, b: f64) -> Self {
        Self::new(name, DistributionKind::Beta, [("a", a), ("b", b)])
    }

    pub fn gamma(name: impl Into<String>, shape: f64, scale: f64) -> Self {
        Self::new(
            name,
            DistributionKind::Gamma,
            [("shape", shape), ("scale", scale)],
        )
    }

    /// Validate the parameters and build the concrete distribution
    pub fn resolve(&self) -> Result<Distribution> {
        Distribution::from_params(self.distribution, &self.params)
    }
}
