//! Validated distributions: i.i.d. sampling and quantile functions.
//!
//! Sampling goes through `rand_distr`; quantiles use closed forms where they
//! exist and numerically invert the `statrs` CDF for beta and gamma.

use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;
use statrs::function::erf::{erfc, erfc_inv};

use super::assumption::{DistributionKind, Params};
use crate::error::{Result, SimulationError};

/// Bisection stops once the bracket is this narrow relative to its midpoint
const QUANTILE_TOLERANCE: f64 = 1e-12;
const QUANTILE_MAX_ITERATIONS: usize = 200;

/// A distribution whose parameters have passed domain validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Distribution {
    Normal {
        mean: f64,
        std: f64,
    },
    /// `mean` and `sigma` are the parameters of the underlying normal
    LogNormal {
        mean: f64,
        sigma: f64,
    },
    Uniform {
        low: f64,
        high: f64,
    },
    Triangular {
        low: f64,
        mode: f64,
        high: f64,
    },
    Exponential {
        rate: f64,
    },
    Beta {
        a: f64,
        b: f64,
    },
    Gamma {
        shape: f64,
        scale: f64,
    },
}

/// Look up the first present alias of a required parameter
fn param(params: &Params, kind: DistributionKind, aliases: &[&str]) -> Result<f64> {
    let (name, value) = aliases
        .iter()
        .find_map(|alias| params.get(*alias).map(|v| (*alias, *v)))
        .ok_or_else(|| {
            SimulationError::invalid_parameter(
                kind.as_str(),
                format!("missing required parameter `{}`", aliases[0]),
            )
        })?;

    if !value.is_finite() {
        return Err(SimulationError::invalid_parameter(
            kind.as_str(),
            format!("`{name}` must be finite, got {value}"),
        ));
    }
    Ok(value)
}

fn ensure(condition: bool, kind: DistributionKind, reason: impl Into<String>) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(SimulationError::invalid_parameter(kind.as_str(), reason))
    }
}

/// Bounded families need a representable range to sample from
fn ensure_width(low: f64, high: f64, kind: DistributionKind) -> Result<()> {
    ensure(
        (high - low).is_finite(),
        kind,
        format!("range high - low overflows, got low={low}, high={high}"),
    )
}

/// Standard normal CDF
#[must_use]
pub fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal quantile (probit)
#[must_use]
pub fn standard_normal_quantile(p: f64) -> f64 {
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * p)
}

/// Invert a monotone CDF by bisection, widening `hi` until it brackets `p`.
fn invert_cdf(cdf: impl Fn(f64) -> f64, p: f64, mut lo: f64, mut hi: f64) -> f64 {
    while cdf(hi) < p {
        lo = hi;
        hi *= 2.0;
        if !hi.is_finite() {
            return f64::INFINITY;
        }
    }

    for _ in 0..QUANTILE_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if cdf(mid) >= p {
            hi = mid;
        } else {
            lo = mid;
        }
        if hi - lo <= QUANTILE_TOLERANCE * mid.abs().max(1.0) {
            break;
        }
    }
    0.5 * (lo + hi)
}

fn draw<D, R>(dist: D, rng: &mut R, n: usize) -> Vec<f64>
where
    D: rand_distr::Distribution<f64>,
    R: Rng + ?Sized,
{
    (0..n).map(|_| dist.sample(rng)).collect()
}

impl Distribution {
    /// Build a distribution from a kind and its named parameters.
    ///
    /// Accepted names (first listed is canonical):
    /// - normal: `mean`, `std`
    /// - lognormal: `mean`/`mu`, `sigma`
    /// - uniform: `low`/`min`, `high`/`max`
    /// - triangular: `low`/`left`, `mode`, `high`/`right`
    /// - exponential: `rate`, or `scale` (= 1 / rate)
    /// - beta: `a`/`alpha`, `b`/`beta`
    /// - gamma: `shape`, `scale`
    pub fn from_params(kind: DistributionKind, params: &Params) -> Result<Self> {
        match kind {
            DistributionKind::Normal => {
                let mean = param(params, kind, &["mean"])?;
                let std = param(params, kind, &["std", "std_dev"])?;
                ensure(std >= 0.0, kind, format!("std must be >= 0, got {std}"))?;
                Ok(Distribution::Normal { mean, std })
            }
            DistributionKind::LogNormal => {
                let mean = param(params, kind, &["mean", "mu"])?;
                let sigma = param(params, kind, &["sigma"])?;
                ensure(sigma >= 0.0, kind, format!("sigma must be >= 0, got {sigma}"))?;
                Ok(Distribution::LogNormal { mean, sigma })
            }
            DistributionKind::Uniform => {
                let low = param(params, kind, &["low", "min"])?;
                let high = param(params, kind, &["high", "max"])?;
                ensure(
                    low <= high,
                    kind,
                    format!("low must be <= high, got low={low}, high={high}"),
                )?;
                ensure_width(low, high, kind)?;
                Ok(Distribution::Uniform { low, high })
            }
            DistributionKind::Triangular => {
                let low = param(params, kind, &["low", "left"])?;
                let mode = param(params, kind, &["mode"])?;
                let high = param(params, kind, &["high", "right"])?;
                ensure(
                    low <= mode && mode <= high,
                    kind,
                    format!("requires low <= mode <= high, got {low}, {mode}, {high}"),
                )?;
                ensure_width(low, high, kind)?;
                Ok(Distribution::Triangular { low, mode, high })
            }
            DistributionKind::Exponential => {
                let rate = if params.contains_key("rate") {
                    param(params, kind, &["rate"])?
                } else {
                    let scale = param(params, kind, &["scale"])?;
                    ensure(scale > 0.0, kind, format!("scale must be > 0, got {scale}"))?;
                    1.0 / scale
                };
                ensure(rate > 0.0, kind, format!("rate must be > 0, got {rate}"))?;
                Ok(Distribution::Exponential { rate })
            }
            DistributionKind::Beta => {
                let a = param(params, kind, &["a", "alpha"])?;
                let b = param(params, kind, &["b", "beta"])?;
                ensure(a > 0.0, kind, format!("a must be > 0, got {a}"))?;
                ensure(b > 0.0, kind, format!("b must be > 0, got {b}"))?;
                Ok(Distribution::Beta { a, b })
            }
            DistributionKind::Gamma => {
                let shape = param(params, kind, &["shape"])?;
                let scale = param(params, kind, &["scale"])?;
                ensure(shape > 0.0, kind, format!("shape must be > 0, got {shape}"))?;
                ensure(scale >= 0.0, kind, format!("scale must be >= 0, got {scale}"))?;
                Ok(Distribution::Gamma { shape, scale })
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> DistributionKind {
        match self {
            Distribution::Normal { .. } => DistributionKind::Normal,
            Distribution::LogNormal { .. } => DistributionKind::LogNormal,
            Distribution::Uniform { .. } => DistributionKind::Uniform,
            Distribution::Triangular { .. } => DistributionKind::Triangular,
            Distribution::Exponential { .. } => DistributionKind::Exponential,
            Distribution::Beta { .. } => DistributionKind::Beta,
            Distribution::Gamma { .. } => DistributionKind::Gamma,
        }
    }

    /// The single value of a zero-spread distribution, if this is one.
    #[must_use]
    pub fn point_mass(&self) -> Option<f64> {
        match *self {
            Distribution::Normal { mean, std } if std == 0.0 => Some(mean),
            Distribution::LogNormal { mean, sigma } if sigma == 0.0 => Some(mean.exp()),
            Distribution::Uniform { low, high } if low == high => Some(low),
            Distribution::Triangular { low, mode, high } if low == high => Some(mode),
            Distribution::Gamma { scale, .. } if scale == 0.0 => Some(0.0),
            _ => None,
        }
    }

    /// Analytic mean
    #[must_use]
    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Normal { mean, .. } => mean,
            Distribution::LogNormal { mean, sigma } => (mean + 0.5 * sigma * sigma).exp(),
            Distribution::Uniform { low, high } => 0.5 * (low + high),
            Distribution::Triangular { low, mode, high } => (low + mode + high) / 3.0,
            Distribution::Exponential { rate } => 1.0 / rate,
            Distribution::Beta { a, b } => a / (a + b),
            Distribution::Gamma { shape, scale } => shape * scale,
        }
    }

    /// Draw `n` i.i.d. samples. Zero-spread distributions return `n` copies of
    /// their point mass without consuming randomness.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<f64>> {
        if let Some(value) = self.point_mass() {
            return Ok(vec![value; n]);
        }

        let kind = self.kind().as_str();
        let invalid = |e: &dyn std::fmt::Display| SimulationError::invalid_parameter(kind, e.to_string());

        let samples = match *self {
            Distribution::Normal { mean, std } => {
                draw(rand_distr::Normal::new(mean, std).map_err(|e| invalid(&e))?, rng, n)
            }
            Distribution::LogNormal { mean, sigma } => draw(
                rand_distr::LogNormal::new(mean, sigma).map_err(|e| invalid(&e))?,
                rng,
                n,
            ),
            Distribution::Uniform { low, high } => draw(
                rand_distr::Uniform::new(low, high).map_err(|e| invalid(&e))?,
                rng,
                n,
            ),
            Distribution::Triangular { low, mode, high } => draw(
                rand_distr::Triangular::new(low, high, mode).map_err(|e| invalid(&e))?,
                rng,
                n,
            ),
            Distribution::Exponential { rate } => {
                draw(rand_distr::Exp::new(rate).map_err(|e| invalid(&e))?, rng, n)
            }
            Distribution::Beta { a, b } => {
                draw(rand_distr::Beta::new(a, b).map_err(|e| invalid(&e))?, rng, n)
            }
            Distribution::Gamma { shape, scale } => draw(
                rand_distr::Gamma::new(shape, scale).map_err(|e| invalid(&e))?,
                rng,
                n,
            ),
        };
        Ok(samples)
    }

    /// Inverse CDF at probability `p` in `[0, 1]`.
    pub fn quantile(&self, p: f64) -> Result<f64> {
        Ok(self.quantiles(&[p])?[0])
    }

    /// Inverse CDF for each probability in `probs`, each in `[0, 1]`.
    pub fn quantiles(&self, probs: &[f64]) -> Result<Vec<f64>> {
        if let Some(p) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(SimulationError::invalid_parameter(
                "quantile",
                format!("probability must be in [0, 1], got {p}"),
            ));
        }
        if let Some(value) = self.point_mass() {
            return Ok(vec![value; probs.len()]);
        }

        let kind = self.kind().as_str();
        let values = match *self {
            Distribution::Normal { mean, std } => probs
                .iter()
                .map(|&p| mean + std * standard_normal_quantile(p))
                .collect(),
            Distribution::LogNormal { mean, sigma } => probs
                .iter()
                .map(|&p| (mean + sigma * standard_normal_quantile(p)).exp())
                .collect(),
            Distribution::Uniform { low, high } => {
                probs.iter().map(|&p| low + p * (high - low)).collect()
            }
            Distribution::Triangular { low, mode, high } => {
                let width = high - low;
                let split = (mode - low) / width;
                probs
                    .iter()
                    .map(|&p| {
                        if p < split {
                            low + (p * width * (mode - low)).sqrt()
                        } else {
                            high - ((1.0 - p) * width * (high - mode)).sqrt()
                        }
                    })
                    .collect()
            }
            Distribution::Exponential { rate } => {
                probs.iter().map(|&p| -(1.0 - p).ln() / rate).collect()
            }
            Distribution::Beta { a, b } => {
                let beta = statrs::distribution::Beta::new(a, b)
                    .map_err(|e| SimulationError::invalid_parameter(kind, e.to_string()))?;
                probs
                    .iter()
                    .map(|&p| {
                        if p <= 0.0 {
                            0.0
                        } else if p >= 1.0 {
                            1.0
                        } else {
                            invert_cdf(|x| beta.cdf(x), p, 0.0, 1.0)
                        }
                    })
                    .collect()
            }
            Distribution::Gamma { shape, scale } => {
                let gamma = statrs::distribution::Gamma::new(shape, 1.0 / scale)
                    .map_err(|e| SimulationError::invalid_parameter(kind, e.to_string()))?;
                let start = (shape * scale).max(f64::MIN_POSITIVE);
                probs
                    .iter()
                    .map(|&p| {
                        if p <= 0.0 {
                            0.0
                        } else if p >= 1.0 {
                            f64::INFINITY
                        } else {
                            invert_cdf(|x| gamma.cdf(x), p, 0.0, start)
                        }
                    })
                    .collect()
            }
        };
        Ok(values)
    }
}
