//! Decay curves fit to per-frame mean intensity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::Error;
use crate::fit::{optimize, LMConfig, LMModel, LMResult, Termination};

/// Decay rates below this are treated as no decay when seeding the bi-exponential fit.
const MIN_SEED_RATE: f64 = 1e-3;

/// Shape of the bleaching curve.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DecayModel {
    /// `a·exp(-b·t)`
    #[default]
    Mono,
    /// `a·exp(-b·t) + c·exp(-d·t)`
    Bi,
}

impl DecayModel {
    pub fn param_count(self) -> usize {
        match self {
            DecayModel::Mono => 2,
            DecayModel::Bi => 4,
        }
    }

    /// Value of the curve with `params` at frame `t`.
    ///
    /// # Panics
    /// Panics if `params` is shorter than [`param_count`](Self::param_count).
    pub fn evaluate(self, t: f64, params: &[f64]) -> f64 {
        match self {
            DecayModel::Mono => MonoExponential.evaluate(t, &[params[0], params[1]]),
            DecayModel::Bi => {
                BiExponential.evaluate(t, &[params[0], params[1], params[2], params[3]])
            }
        }
    }

    /// Least-squares fit of the curve to `means` sampled at `t = 0..N-1`.
    pub(crate) fn fit(
        self,
        means: &[f64],
        config: &LMConfig,
    ) -> std::result::Result<CurveFit, FitFailure> {
        let frames = means.len();
        if frames < self.param_count() {
            return Err(FitFailure::InsufficientData {
                frames,
                params: self.param_count(),
            });
        }

        let t: Vec<f64> = (0..frames).map(|i| i as f64).collect();
        let seed = mono_seed(&t, means);
        match self {
            DecayModel::Mono => {
                CurveFit::from_result(optimize(&MonoExponential, &t, means, seed, config))
            }
            DecayModel::Bi => {
                let [a, b] = seed;
                let fast = if b.abs() > MIN_SEED_RATE { 2.0 * b } else { 0.1 };
                let initial = [0.5 * a, fast, 0.5 * a, 0.5 * b];
                CurveFit::from_result(optimize(&BiExponential, &t, means, initial, config))
            }
        }
    }
}

impl FromStr for DecayModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mono" => Ok(DecayModel::Mono),
            "bi" => Ok(DecayModel::Bi),
            other => Err(Error::UnknownCurve(other.to_string())),
        }
    }
}

/// Why a fit was discarded in favor of the flat curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FitFailure {
    /// Fewer frames than curve parameters.
    InsufficientData { frames: usize, params: usize },
    /// Iteration limit reached before convergence.
    NotConverged { iterations: usize },
    /// The normal equations were singular, so the means do not determine the curve.
    Singular { iterations: usize },
    /// Parameters or curve values are not finite.
    NonFinite,
    /// The fitted curve never rises above zero, so it cannot be normalized.
    NonPositivePeak,
}

/// Parameters of a successful optimizer run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CurveFit {
    pub params: Vec<f64>,
    pub termination: Termination,
    pub iterations: usize,
}

impl CurveFit {
    fn from_result<const N: usize>(
        result: LMResult<N>,
    ) -> std::result::Result<Self, FitFailure> {
        match result.termination {
            Termination::NonFinite => return Err(FitFailure::NonFinite),
            Termination::MaxIterations => {
                return Err(FitFailure::NotConverged {
                    iterations: result.iterations,
                })
            }
            Termination::Singular => {
                return Err(FitFailure::Singular {
                    iterations: result.iterations,
                })
            }
            Termination::Converged | Termination::Stalled => {}
        }
        if !result.params.iter().all(|p| p.is_finite()) {
            return Err(FitFailure::NonFinite);
        }
        Ok(Self {
            params: result.params.to_vec(),
            termination: result.termination,
            iterations: result.iterations,
        })
    }
}

/// Starting point from a straight-line fit of `ln(y)` over the positive samples.
/// Falls back to `[1, 1]` when fewer than two samples are positive.
fn mono_seed(t: &[f64], y: &[f64]) -> [f64; 2] {
    let points: Vec<(f64, f64)> = t
        .iter()
        .zip(y)
        .filter(|&(_, &y)| y > 0.0 && y.is_finite())
        .map(|(&t, &y)| (t, y.ln()))
        .collect();
    if points.len() < 2 {
        return [1.0, 1.0];
    }

    let n = points.len() as f64;
    let mean_t = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_ln = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (cov, var) = points.iter().fold((0.0, 0.0), |(cov, var), &(t, ln_y)| {
        let dt = t - mean_t;
        (cov + dt * (ln_y - mean_ln), var + dt * dt)
    });
    if var == 0.0 {
        return [1.0, 1.0];
    }

    let slope = cov / var;
    let a = (mean_ln - slope * mean_t).exp();
    let b = -slope;
    if a.is_finite() && b.is_finite() {
        [a, b]
    } else {
        [1.0, 1.0]
    }
}

struct MonoExponential;

impl LMModel<2> for MonoExponential {
    #[inline]
    fn evaluate(&self, t: f64, params: &[f64; 2]) -> f64 {
        params[0] * (-params[1] * t).exp()
    }

    #[inline]
    fn jacobian_row(&self, t: f64, params: &[f64; 2]) -> [f64; 2] {
        let e = (-params[1] * t).exp();
        [e, -params[0] * t * e]
    }
}

struct BiExponential;

impl LMModel<4> for BiExponential {
    #[inline]
    fn evaluate(&self, t: f64, params: &[f64; 4]) -> f64 {
        params[0] * (-params[1] * t).exp() + params[2] * (-params[3] * t).exp()
    }

    #[inline]
    fn jacobian_row(&self, t: f64, params: &[f64; 4]) -> [f64; 4] {
        let e1 = (-params[1] * t).exp();
        let e2 = (-params[3] * t).exp();
        [e1, -params[0] * t * e1, e2, -params[2] * t * e2]
    }
}
