//! Box-constrained Levenberg-Marquardt nonlinear least-squares solver.
//!
//! This module provides the [`LevenbergMarquardtSolver`] for fitting model
//! parameters to market quotes.
//!
//! # Algorithm
//!
//! Each iteration solves the Marquardt-scaled normal equations
//!
//! ```text
//! (J^T J + λ diag(J^T J)) δ = -J^T r
//! p_{n+1} = Π(p_n + δ)
//! ```
//!
//! where:
//! - `J` is the forward-difference Jacobian of the residuals
//! - `r` is the residual vector
//! - `λ` is the damping factor (decreased on accepted steps, increased on rejections)
//! - `Π` projects onto the box `[min_i, max_i]`
//!
//! Parameters sitting on a bound whose gradient points outward are frozen
//! for the iteration (active set), so the step is taken in the free
//! subspace only. Returned parameters are therefore always inside the box.
//!
//! # Example
//!
//! ```
//! use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig, ParameterBounds};
//!
//! // Fit y = a * exp(-b * x) to data
//! let x_data = vec![0.0, 1.0, 2.0, 3.0, 4.0];
//! let y_data: Vec<f64> = x_data.iter().map(|x: &f64| 2.0 * (-0.5 * x).exp()).collect();
//!
//! let solver = LevenbergMarquardtSolver::new(LMConfig::default());
//!
//! let residuals = |params: &[f64]| -> Vec<f64> {
//!     x_data.iter().zip(&y_data).map(|(&x, &y)| {
//!         params[0] * (-params[1] * x).exp() - y
//!     }).collect()
//! };
//!
//! let bounds = [ParameterBounds::new(0.0, 10.0), ParameterBounds::new(0.0, 2.0)];
//! let result = solver.solve_bounded(residuals, vec![1.0, 1.0], &bounds).unwrap();
//!
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-6);
//! assert!((result.params[1] - 0.5).abs() < 1e-6);
//! ```

use super::bounds::ParameterBounds;
use crate::types::SolverError;
use tracing::debug;

/// Configuration for Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LMConfig {
    /// Convergence tolerance on the residual norm `||r||`.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Factor to increase lambda on rejected step.
    pub lambda_up: f64,
    /// Factor to decrease lambda on accepted step.
    pub lambda_down: f64,
    /// Minimum damping factor.
    pub min_lambda: f64,
    /// Maximum damping factor.
    pub max_lambda: f64,
    /// Tolerance for relative parameter change convergence.
    pub param_tolerance: f64,
    /// Tolerance for relative reduction of the sum of squares on an accepted step.
    pub relative_tolerance: f64,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            param_tolerance: 1e-10,
            relative_tolerance: 1e-12,
        }
    }
}

impl LMConfig {
    /// Create a new LM configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Create a fast configuration with relaxed tolerances.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
            relative_tolerance: 1e-8,
            ..Default::default()
        }
    }

    /// Create a high precision configuration.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-14,
            max_iterations: 500,
            param_tolerance: 1e-14,
            relative_tolerance: 1e-15,
            ..Default::default()
        }
    }
}

/// Why the solver stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LMTermination {
    /// Residual norm fell below `tolerance`.
    ResidualTolerance,
    /// Projected step fell below `param_tolerance`.
    ParameterTolerance,
    /// Accepted step reduced the sum of squares by less than `relative_tolerance`.
    RelativeReduction,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Damping reached `max_lambda` without finding a descent step.
    Stalled,
}

impl LMTermination {
    /// True for the tolerance-based stopping rules.
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            LMTermination::ResidualTolerance
                | LMTermination::ParameterTolerance
                | LMTermination::RelativeReduction
        )
    }
}

/// Result of Levenberg-Marquardt optimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Best parameters found.
    pub params: Vec<f64>,
    /// Residuals at `params`.
    pub residuals: Vec<f64>,
    /// Residual sum of squares at `params`.
    pub residual_ss: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether a tolerance was met.
    pub converged: bool,
    /// Stopping reason.
    pub termination: LMTermination,
    /// Final lambda value.
    pub final_lambda: f64,
}

impl LMResult {
    /// Get the root mean square error.
    pub fn rmse(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        (self.residual_ss / self.residuals.len() as f64).sqrt()
    }
}

/// Levenberg-Marquardt nonlinear least-squares solver.
///
/// Solves problems of the form
/// ```text
/// min_p ||f(p)||^2   subject to   min_i <= p_i <= max_i
/// ```
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
///
/// let solver = LevenbergMarquardtSolver::new(LMConfig::default());
///
/// // minimise (p[0] - 2)^2 + (p[1] - 3)^2
/// let residuals = |params: &[f64]| -> Vec<f64> {
///     vec![params[0] - 2.0, params[1] - 3.0]
/// };
///
/// let result = solver.solve(residuals, vec![0.0, 0.0]).unwrap();
/// assert!(result.converged);
/// assert!((result.params[0] - 2.0).abs() < 1e-6);
/// assert!((result.params[1] - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a new LM solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with default configuration.
    pub fn with_defaults() -> Self {
        Self {
            config: LMConfig::default(),
        }
    }

    /// Get the solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Solve an unconstrained problem.
    pub fn solve<F>(&self, residuals: F, initial_params: Vec<f64>) -> Result<LMResult, SolverError>
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        let bounds = vec![ParameterBounds::unbounded(); initial_params.len()];
        self.solve_bounded(residuals, initial_params, &bounds)
    }

    /// Solve a box-constrained problem with an infallible residual function.
    pub fn solve_bounded<F>(
        &self,
        mut residuals: F,
        initial_params: Vec<f64>,
        bounds: &[ParameterBounds],
    ) -> Result<LMResult, SolverError>
    where
        F: FnMut(&[f64]) -> Vec<f64>,
    {
        self.try_solve_bounded(
            |p: &[f64]| Ok::<_, SolverError>(residuals(p)),
            initial_params,
            bounds,
        )
    }

    /// Solve a box-constrained problem whose residual function may fail.
    ///
    /// An `Err` from `residuals` aborts the solve and is returned unchanged;
    /// use it for failures that no parameter move can fix. Non-finite
    /// residuals at a trial point are treated as a rejected step instead.
    ///
    /// # Errors
    ///
    /// * `SolverError::DimensionMismatch` - bounds and parameters differ in length
    /// * `SolverError::InvalidBounds` - an empty or NaN interval
    /// * `SolverError::NumericalInstability` - empty problem or non-finite
    ///   residuals at the initial point
    pub fn try_solve_bounded<F, E>(
        &self,
        mut residuals: F,
        initial_params: Vec<f64>,
        bounds: &[ParameterBounds],
    ) -> Result<LMResult, E>
    where
        F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
        E: From<SolverError>,
    {
        let n_params = initial_params.len();
        if n_params == 0 {
            return Err(SolverError::NumericalInstability("Empty parameter vector".to_string()).into());
        }
        if bounds.len() != n_params {
            return Err(SolverError::DimensionMismatch {
                expected: n_params,
                actual: bounds.len(),
            }
            .into());
        }
        if let Some((index, b)) = bounds.iter().enumerate().find(|(_, b)| !b.is_valid()) {
            return Err(SolverError::InvalidBounds {
                index,
                min: b.min,
                max: b.max,
            }
            .into());
        }

        let mut params = project(&initial_params, bounds);
        let mut lambda = self.config.initial_lambda;

        let mut r = residuals(&params)?;
        if r.is_empty() {
            return Err(SolverError::NumericalInstability("Empty residual vector".to_string()).into());
        }
        let mut ss = sum_of_squares(&r);
        if !ss.is_finite() {
            return Err(SolverError::NumericalInstability(
                "Non-finite residuals at initial parameters".to_string(),
            )
            .into());
        }

        let finish = |params: Vec<f64>,
                      r: Vec<f64>,
                      ss: f64,
                      iterations: usize,
                      termination: LMTermination,
                      lambda: f64| {
            debug!(iterations, residual_ss = ss, ?termination, "LM solve finished");
            LMResult {
                params,
                residuals: r,
                residual_ss: ss,
                iterations,
                converged: termination.is_converged(),
                termination,
                final_lambda: lambda,
            }
        };

        for iteration in 0..self.config.max_iterations {
            if ss.sqrt() < self.config.tolerance {
                return Ok(finish(params, r, ss, iteration, LMTermination::ResidualTolerance, lambda));
            }

            let jacobian = compute_jacobian(&mut residuals, &params, &r, bounds)?;
            let gradient = jt_r(&jacobian, &r, n_params);
            let free = free_parameters(&params, &gradient, bounds);

            let delta = match solve_normal_equations(&jacobian, &gradient, &free, lambda) {
                Some(d) => d,
                None => {
                    if lambda >= self.config.max_lambda {
                        return Ok(finish(params, r, ss, iteration + 1, LMTermination::Stalled, lambda));
                    }
                    lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
                    continue;
                }
            };

            let trial: Vec<f64> = params
                .iter()
                .zip(&delta)
                .zip(bounds)
                .map(|((p, d), b)| b.clamp(p + d))
                .collect();

            let step_norm = trial
                .iter()
                .zip(&params)
                .map(|(t, p)| (t - p) * (t - p))
                .sum::<f64>()
                .sqrt();
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt().max(1.0);
            if step_norm / param_norm < self.config.param_tolerance {
                return Ok(finish(params, r, ss, iteration + 1, LMTermination::ParameterTolerance, lambda));
            }

            let trial_r = residuals(&trial)?;
            let trial_ss = sum_of_squares(&trial_r);

            if trial_ss.is_finite() && trial_ss < ss {
                let reduction = (ss - trial_ss) / ss;
                params = trial;
                r = trial_r;
                ss = trial_ss;
                lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                debug!(iteration, residual_ss = ss, lambda, "LM step accepted");

                if reduction < self.config.relative_tolerance {
                    return Ok(finish(params, r, ss, iteration + 1, LMTermination::RelativeReduction, lambda));
                }
            } else {
                if lambda >= self.config.max_lambda {
                    return Ok(finish(params, r, ss, iteration + 1, LMTermination::Stalled, lambda));
                }
                lambda = (lambda * self.config.lambda_up).min(self.config.max_lambda);
            }
        }

        Ok(finish(
            params,
            r,
            ss,
            self.config.max_iterations,
            LMTermination::MaxIterations,
            lambda,
        ))
    }
}

fn project(params: &[f64], bounds: &[ParameterBounds]) -> Vec<f64> {
    params.iter().zip(bounds).map(|(p, b)| b.clamp(*p)).collect()
}

/// Forward-difference Jacobian; switches to a backward difference when the
/// forward point would leave the box.
fn compute_jacobian<F, E>(
    residuals: &mut F,
    params: &[f64],
    r0: &[f64],
    bounds: &[ParameterBounds],
) -> Result<Vec<Vec<f64>>, E>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>, E>,
{
    let n_params = params.len();
    let n_residuals = r0.len();
    let eps = 1e-8;

    let mut jacobian = vec![vec![0.0; n_params]; n_residuals];
    let mut shifted = params.to_vec();

    for j in 0..n_params {
        let mut h = eps * params[j].abs().max(1.0);
        if params[j] + h > bounds[j].max {
            h = -h;
        }
        shifted[j] = params[j] + h;
        let r_shift = residuals(&shifted)?;
        shifted[j] = params[j];

        for i in 0..n_residuals {
            let diff = (r_shift[i] - r0[i]) / h;
            jacobian[i][j] = if diff.is_finite() { diff } else { 0.0 };
        }
    }

    Ok(jacobian)
}

/// `J^T r`, the half-gradient of the sum of squares.
fn jt_r(jacobian: &[Vec<f64>], r: &[f64], n_params: usize) -> Vec<f64> {
    let mut g = vec![0.0; n_params];
    for (row, ri) in jacobian.iter().zip(r) {
        for (gj, jij) in g.iter_mut().zip(row) {
            *gj += jij * ri;
        }
    }
    g
}

/// A parameter is pinned when it sits on a bound and descent would push it out.
fn free_parameters(params: &[f64], gradient: &[f64], bounds: &[ParameterBounds]) -> Vec<bool> {
    params
        .iter()
        .zip(gradient)
        .zip(bounds)
        .map(|((&p, &g), b)| !((p <= b.min && g > 0.0) || (p >= b.max && g < 0.0)))
        .collect()
}

/// Solve `(J^T J + λ diag(J^T J)) δ = -J^T r` over the free parameters.
/// Pinned parameters receive a zero step.
fn solve_normal_equations(
    jacobian: &[Vec<f64>],
    gradient: &[f64],
    free: &[bool],
    lambda: f64,
) -> Option<Vec<f64>> {
    let index: Vec<usize> = (0..free.len()).filter(|&i| free[i]).collect();
    let m = index.len();
    let mut delta = vec![0.0; free.len()];
    if m == 0 {
        return Some(delta);
    }

    let mut a = vec![vec![0.0; m]; m];
    for (ai, &i) in index.iter().enumerate() {
        for (aj, &j) in index.iter().enumerate() {
            a[ai][aj] = jacobian.iter().map(|row| row[i] * row[j]).sum();
        }
    }
    for (k, row) in a.iter_mut().enumerate() {
        row[k] += lambda * row[k].max(1e-12);
    }

    let b: Vec<f64> = index.iter().map(|&i| -gradient[i]).collect();
    let x = solve_cholesky(&a, &b)?;
    for (k, &i) in index.iter().enumerate() {
        delta[i] = x[k];
    }
    Some(delta)
}

#[inline]
fn sum_of_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Solve `Ax = b` for symmetric positive definite `A` via Cholesky.
fn solve_cholesky(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if n == 0 || a.len() != n {
        return None;
    }

    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L^T x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
