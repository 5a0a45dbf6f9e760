//! Levenberg-Marquardt optimizer for one-dimensional curve fits `y = f(t; p)`.
//!
//! Uses f64 throughout. Evaluation may overflow (e.g. `exp` of a large
//! argument); a step producing a non-finite chi² is rejected like any other
//! step that fails to improve the fit.

use serde::{Deserialize, Serialize};

use super::linear_solver::solve;

/// Configuration for Levenberg-Marquardt optimization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LMConfig {
    /// Maximum iterations before the fit is declared failed.
    pub max_iterations: usize,
    /// Relative reduction of chi² below which the fit has converged.
    pub ftol: f64,
    /// Relative parameter change below which the fit has converged.
    pub xtol: f64,
    /// Initial damping parameter.
    pub initial_lambda: f64,
    /// Factor to increase lambda on failed step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on successful step.
    pub lambda_down: f64,
    /// Damping above which no further improvement is attempted.
    pub max_lambda: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            initial_lambda: 0.001,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e10,
        }
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Chi² or parameter change fell below tolerance.
    Converged,
    /// No damped step improves chi²; the parameters are a local minimum.
    Stalled,
    /// Normal equations became singular; the parameters are not determined by the data.
    Singular,
    /// Iteration limit reached while still improving.
    MaxIterations,
    /// The initial parameters do not evaluate to a finite chi².
    NonFinite,
}

impl Termination {
    /// Whether the parameters are usable as a fit result.
    pub fn is_success(self) -> bool {
        matches!(self, Termination::Converged | Termination::Stalled)
    }
}

/// Result of L-M optimization.
#[derive(Debug, Clone, Copy)]
pub struct LMResult<const N: usize> {
    pub params: [f64; N],
    pub termination: Termination,
    pub iterations: usize,
}

/// A curve model with `N` parameters that can be fit with L-M optimization.
pub trait LMModel<const N: usize> {
    /// Evaluate the model at `t`.
    fn evaluate(&self, t: f64, params: &[f64; N]) -> f64;

    /// Partial derivatives with respect to each parameter at `t`.
    fn jacobian_row(&self, t: f64, params: &[f64; N]) -> [f64; N];

    /// Apply parameter constraints after an update.
    fn constrain(&self, _params: &mut [f64; N]) {}
}

/// Run L-M optimization of `model` against samples `(data_t[i], data_y[i])`.
pub fn optimize<const N: usize, M: LMModel<N>>(
    model: &M,
    data_t: &[f64],
    data_y: &[f64],
    initial_params: [f64; N],
    config: &LMConfig,
) -> LMResult<N> {
    debug_assert_eq!(data_t.len(), data_y.len());

    let mut params = initial_params;
    let mut lambda = config.initial_lambda;
    let mut prev_chi2 = compute_chi2(model, data_t, data_y, &params);
    let mut iterations = 0;

    if !prev_chi2.is_finite() {
        return LMResult {
            params,
            termination: Termination::NonFinite,
            iterations,
        };
    }

    let n = data_t.len();
    let mut jacobian = Vec::with_capacity(n);
    let mut residuals = Vec::with_capacity(n);
    let mut termination = Termination::MaxIterations;

    for iter in 0..config.max_iterations {
        iterations = iter + 1;

        if prev_chi2 <= f64::MIN_POSITIVE {
            termination = Termination::Converged;
            break;
        }

        fill_jacobian_residuals(model, data_t, data_y, &params, &mut jacobian, &mut residuals);
        let (hessian, gradient) = compute_hessian_gradient(&jacobian, &residuals);

        let mut damped_hessian = hessian;
        for (i, row) in damped_hessian.iter_mut().enumerate() {
            // Keep a floor so parameters with a vanishing column still get damped.
            row[i] += lambda * row[i].max(f64::EPSILON);
        }

        let Some(delta) = solve(&damped_hessian, &gradient) else {
            termination = Termination::Singular;
            break;
        };

        let mut new_params = params;
        for (p, d) in new_params.iter_mut().zip(delta.iter()) {
            *p += d;
        }
        model.constrain(&mut new_params);

        let new_chi2 = compute_chi2(model, data_t, data_y, &new_params);

        if new_chi2.is_finite() && new_chi2 < prev_chi2 {
            let reduction = (prev_chi2 - new_chi2) / prev_chi2;
            let small_step = delta
                .iter()
                .zip(new_params.iter())
                .all(|(d, p)| d.abs() <= config.xtol * (p.abs() + config.xtol));

            params = new_params;
            lambda *= config.lambda_down;
            prev_chi2 = new_chi2;

            if reduction <= config.ftol || small_step {
                termination = Termination::Converged;
                break;
            }
        } else {
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                termination = Termination::Stalled;
                break;
            }
        }
    }

    LMResult {
        params,
        termination,
        iterations,
    }
}

fn compute_chi2<const N: usize, M: LMModel<N>>(
    model: &M,
    data_t: &[f64],
    data_y: &[f64],
    params: &[f64; N],
) -> f64 {
    data_t
        .iter()
        .zip(data_y.iter())
        .map(|(&t, &y)| {
            let residual = y - model.evaluate(t, params);
            residual * residual
        })
        .sum()
}

/// Fill jacobian and residuals buffers, reusing existing allocations.
fn fill_jacobian_residuals<const N: usize, M: LMModel<N>>(
    model: &M,
    data_t: &[f64],
    data_y: &[f64],
    params: &[f64; N],
    jacobian: &mut Vec<[f64; N]>,
    residuals: &mut Vec<f64>,
) {
    jacobian.clear();
    residuals.clear();

    for (&t, &y) in data_t.iter().zip(data_y.iter()) {
        jacobian.push(model.jacobian_row(t, params));
        residuals.push(y - model.evaluate(t, params));
    }
}

/// Compute Hessian (J^T J) and gradient (J^T r) for N-parameter model.
/// Exploits symmetry: only computes upper triangle, then mirrors.
#[allow(clippy::needless_range_loop)]
fn compute_hessian_gradient<const N: usize>(
    jacobian: &[[f64; N]],
    residuals: &[f64],
) -> ([[f64; N]; N], [f64; N]) {
    let mut hessian = [[0.0f64; N]; N];
    let mut gradient = [0.0f64; N];

    for (row, &r) in jacobian.iter().zip(residuals.iter()) {
        for i in 0..N {
            gradient[i] += row[i] * r;
            for j in i..N {
                hessian[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 1..N {
        for j in 0..i {
            hessian[i][j] = hessian[j][i];
        }
    }

    (hessian, gradient)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = p0 + p1 * t
    struct Line;

    impl LMModel<2> for Line {
        fn evaluate(&self, t: f64, params: &[f64; 2]) -> f64 {
            params[0] + params[1] * t
        }

        fn jacobian_row(&self, t: f64, _params: &[f64; 2]) -> [f64; 2] {
            [1.0, t]
        }
    }

    /// y = p0 * exp(-p1 * t)
    struct Decay;

    impl LMModel<2> for Decay {
        fn evaluate(&self, t: f64, params: &[f64; 2]) -> f64 {
            params[0] * (-params[1] * t).exp()
        }

        fn jacobian_row(&self, t: f64, params: &[f64; 2]) -> [f64; 2] {
            let e = (-params[1] * t).exp();
            [e, -params[0] * t * e]
        }
    }

    #[test]
    fn test_fits_line() {
        let t: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = t.iter().map(|t| 2.0 + 0.5 * t).collect();
        let result = optimize(&Line, &t, &y, [0.0, 0.0], &LMConfig::default());
        assert!(result.termination.is_success());
        assert!((result.params[0] - 2.0).abs() < 1e-6);
        assert!((result.params[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fits_decay_from_ones() {
        let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = t.iter().map(|t| 5.0 * (-0.1 * t).exp()).collect();
        let result = optimize(&Decay, &t, &y, [1.0, 1.0], &LMConfig::default());
        assert!(result.termination.is_success(), "{:?}", result.termination);
        assert!((result.params[0] - 5.0).abs() < 1e-4, "{:?}", result.params);
        assert!((result.params[1] - 0.1).abs() < 1e-5, "{:?}", result.params);
    }

    #[test]
    fn test_exact_start_converges_immediately() {
        let t = [0.0, 1.0, 2.0];
        let y = [1.0, 2.0, 3.0];
        let result = optimize(&Line, &t, &y, [1.0, 1.0], &LMConfig::default());
        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.params, [1.0, 1.0]);
    }

    #[test]
    fn test_undetermined_parameter_is_singular() {
        // p1 never affects the line when every sample sits at t = 0.
        let t = [0.0, 0.0, 0.0];
        let y = [1.0, 2.0, 3.0];
        let result = optimize(&Line, &t, &y, [0.0, 0.0], &LMConfig::default());
        assert_eq!(result.termination, Termination::Singular);
        assert!(!result.termination.is_success());
    }

    #[test]
    fn test_non_finite_start() {
        let t = [0.0, 1000.0];
        let y = [1.0, 1.0];
        let result = optimize(&Decay, &t, &y, [1.0, -1.0], &LMConfig::default());
        assert_eq!(result.termination, Termination::NonFinite);
        assert!(!result.termination.is_success());
    }

    #[test]
    fn test_iteration_limit() {
        let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = t.iter().map(|t| 5.0 * (-0.1 * t).exp()).collect();
        let config = LMConfig {
            max_iterations: 1,
            ..LMConfig::default()
        };
        let result = optimize(&Decay, &t, &y, [1.0, 1.0], &config);
        assert_eq!(result.termination, Termination::MaxIterations);
    }
}
