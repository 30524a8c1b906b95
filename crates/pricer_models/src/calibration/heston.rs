//! Heston model calibration.
//!
//! The calibrator fits `(v0, kappa, theta, sigma, rho)` to an implied
//! volatility surface by minimising the root-mean-square difference
//! between market vols and the vols returned by an [`ImpliedVolOracle`].
//!
//! ## Calibration Approach
//!
//! Uses bounded Levenberg-Marquardt over the parameter vector ordered as
//! [`HestonParamIndex`]. Box bounds are enforced by projection inside the
//! solver, so every trial point is a valid [`HestonParameters`] and the
//! returned parameters are always in bounds.
//!
//! The Feller condition `2 kappa theta >= sigma^2` is handled by
//! [`FellerPolicy`]:
//!
//! ```text
//! Soft:   residuals = [vol_i(p) - market_i]
//! Strict: residuals = [vol_i(p) - market_i, w * max(0, sigma^2 - 2 kappa theta)]
//! ```
//!
//! In strict mode a solution still violating Feller (beyond
//! `feller_tolerance`) is an error; in soft mode it is reported through
//! [`CalibrationResult::feller_satisfied`].

use std::time::Instant;

use pricer_core::market_data::{MarketEnvironment, VolSurface, VolSurfacePoint};
use pricer_core::math::solvers::{LMConfig, LevenbergMarquardtSolver, ParameterBounds};
use pricer_core::types::SolverError;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::error::CalibrationError;
use super::oracle::{ImpliedVolOracle, OracleError};
use super::result::{CalibrationDiagnostics, CalibrationResult};
use crate::models::{HestonParamIndex, HestonParameters};

const PARAM_NAMES: [&str; HestonParamIndex::COUNT] = ["v0", "kappa", "theta", "sigma", "rho"];

/// Box bounds for each Heston parameter.
///
/// Defaults:
///
/// | Parameter | Bounds |
/// |-----------|--------|
/// | v0 | [0.001, 2.0] |
/// | kappa | [0.01, 5.0] |
/// | theta | [0.001, 1.0] |
/// | sigma | [0.01, 1.0] |
/// | rho | [-0.99, 0.99] |
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonBounds {
    /// Initial variance.
    pub v0: ParameterBounds,
    /// Mean-reversion speed.
    pub kappa: ParameterBounds,
    /// Long-run variance.
    pub theta: ParameterBounds,
    /// Vol-of-vol.
    pub sigma: ParameterBounds,
    /// Correlation.
    pub rho: ParameterBounds,
}

impl Default for HestonBounds {
    fn default() -> Self {
        Self {
            v0: ParameterBounds::new(0.001, 2.0),
            kappa: ParameterBounds::new(0.01, 5.0),
            theta: ParameterBounds::new(0.001, 1.0),
            sigma: ParameterBounds::new(0.01, 1.0),
            rho: ParameterBounds::new(-0.99, 0.99),
        }
    }
}

impl HestonBounds {
    /// Bounds ordered as [`HestonParamIndex`].
    pub fn to_array(&self) -> [ParameterBounds; HestonParamIndex::COUNT] {
        [self.v0, self.kappa, self.theta, self.sigma, self.rho]
    }

    /// Check that each interval is non-empty and inside the model's domain:
    /// strictly positive lower bounds for the variance parameters and
    /// `(-1, 1)` for rho.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        for (i, (b, name)) in self.to_array().iter().zip(PARAM_NAMES).enumerate() {
            let in_domain = if i == HestonParamIndex::RHO {
                b.min > -1.0 && b.max < 1.0
            } else {
                b.min > 0.0 && b.min.is_finite()
            };
            if !b.is_valid() || !in_domain {
                return Err(CalibrationError::invalid_bounds(name, b.min, b.max));
            }
        }
        Ok(())
    }

    /// True when every parameter lies inside its interval.
    pub fn contains(&self, params: &HestonParameters) -> bool {
        self.to_array()
            .iter()
            .zip(params.to_array())
            .all(|(b, p)| b.contains(p))
    }

    /// Project a parameter set onto the box.
    pub fn clamp(&self, params: &HestonParameters) -> [f64; HestonParamIndex::COUNT] {
        let mut out = params.to_array();
        for (p, b) in out.iter_mut().zip(self.to_array()) {
            *p = b.clamp(*p);
        }
        out
    }
}

/// Treatment of the Feller condition during calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FellerPolicy {
    /// Report the condition but allow violating fits.
    #[default]
    Soft,
    /// Penalise violation and reject a violating solution.
    Strict,
}

/// Configuration for [`HestonCalibrator`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonCalibrationConfig {
    /// LM solver configuration.
    pub lm: LMConfig,
    /// Parameter bounds.
    pub bounds: HestonBounds,
    /// Feller handling.
    pub feller_policy: FellerPolicy,
    /// Weight `w` of the strict-mode penalty residual.
    pub feller_penalty_weight: f64,
    /// Largest `sigma^2 - 2 kappa theta` accepted in strict mode.
    pub feller_tolerance: f64,
    /// Retries of a retryable oracle failure before the point is penalised.
    pub oracle_retries: u32,
    /// Residual assigned to a point the oracle could not price.
    pub oracle_penalty: f64,
    /// Minimum number of surface points.
    pub min_points: usize,
}

impl Default for HestonCalibrationConfig {
    fn default() -> Self {
        Self {
            lm: LMConfig::default(),
            bounds: HestonBounds::default(),
            feller_policy: FellerPolicy::Soft,
            feller_penalty_weight: 100.0,
            feller_tolerance: 1e-6,
            oracle_retries: 2,
            oracle_penalty: 1.0,
            min_points: HestonParamIndex::COUNT,
        }
    }
}

impl HestonCalibrationConfig {
    /// Set the LM solver configuration.
    pub fn with_lm_config(mut self, lm: LMConfig) -> Self {
        self.lm = lm;
        self
    }

    /// Set parameter bounds.
    pub fn with_bounds(mut self, bounds: HestonBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the Feller policy.
    pub fn with_feller_policy(mut self, policy: FellerPolicy) -> Self {
        self.feller_policy = policy;
        self
    }

    /// Set the retry budget for retryable oracle failures.
    pub fn with_oracle_retries(mut self, retries: u32) -> Self {
        self.oracle_retries = retries;
        self
    }

    /// Set the minimum number of surface points.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Check bounds and numeric settings.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        self.bounds.validate()?;
        if !(self.feller_penalty_weight.is_finite() && self.feller_penalty_weight >= 0.0) {
            return Err(CalibrationError::InvalidConfig {
                name: "feller_penalty_weight",
                value: self.feller_penalty_weight,
            });
        }
        if !(self.feller_tolerance.is_finite() && self.feller_tolerance >= 0.0) {
            return Err(CalibrationError::InvalidConfig {
                name: "feller_tolerance",
                value: self.feller_tolerance,
            });
        }
        if !(self.oracle_penalty.is_finite() && self.oracle_penalty > 0.0) {
            return Err(CalibrationError::InvalidConfig {
                name: "oracle_penalty",
                value: self.oracle_penalty,
            });
        }
        if self.min_points == 0 {
            return Err(CalibrationError::InvalidConfig {
                name: "min_points",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Heston calibrator.
///
/// Holds only configuration; each call to [`calibrate`](Self::calibrate)
/// is independent and the oracle sees nothing but the trial parameters.
///
/// # Example
///
/// ```
/// use pricer_models::calibration::{HestonCalibrator, OracleError};
/// use pricer_models::models::HestonParameters;
/// use pricer_core::market_data::{MarketEnvironment, VolSurface};
/// use pricer_core::types::Date;
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
///     .risk_free_rate(0.02)
///     .build()
///     .unwrap();
///
/// // Toy oracle: ATM vol from expected average variance, skew from rho * sigma
/// let oracle = |p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64| {
///     let a = p.kappa() * t;
///     let w = p.theta() + (p.v0() - p.theta()) * (1.0 - (-a).exp()) / a;
///     let x = (k / env.spot()).ln();
///     Ok::<_, OracleError>(w.sqrt() + 0.5 * p.rho() * p.sigma() * x / w.sqrt()
///         + 0.25 * p.sigma() * p.sigma() * (1.0 - p.rho() * p.rho()) * x * x / w)
/// };
///
/// let truth = HestonParameters::new(0.04, 1.5, 0.06, 0.3, -0.6).unwrap();
/// let mut points = Vec::new();
/// for &t in &[0.25, 1.0, 3.0] {
///     for &k in &[80.0, 100.0, 120.0] {
///         points.push(pricer_core::market_data::VolSurfacePoint::new(
///             t, k, oracle(&truth, &env, t, k).unwrap(),
///         ));
///     }
/// }
/// let surface = VolSurface::new(points).unwrap();
///
/// let guess = HestonParameters::new(0.05, 1.0, 0.05, 0.4, -0.4).unwrap();
/// let result = HestonCalibrator::new().calibrate(&surface, &env, &guess, &oracle).unwrap();
/// assert!(result.converged);
/// assert!(result.rmse() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HestonCalibrator {
    config: HestonCalibrationConfig,
}

impl HestonCalibrator {
    /// Create a calibrator with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration.
    pub fn with_config(config: HestonCalibrationConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &HestonCalibrationConfig {
        &self.config
    }

    /// Fit the model to `surface`, starting from `initial_guess`.
    ///
    /// A guess outside the bounds is projected onto them with a warning.
    /// Non-convergence is reported through `converged == false`, never as
    /// an error.
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` / `InvalidBounds` - bad configuration
    /// * `InvalidSurface` - invalid surface or environment
    /// * `InsufficientData` - fewer than `min_points` quotes
    /// * `InvalidInitialGuess` - the guess fails parameter validation
    /// * `Oracle` - the oracle returned [`OracleError::Fatal`]
    /// * `FellerViolation` - strict mode ended outside the Feller region
    /// * `Solver` - the optimiser could not start
    #[instrument(skip_all, fields(points = surface.len(), policy = ?self.config.feller_policy))]
    pub fn calibrate<O>(
        &self,
        surface: &VolSurface,
        env: &MarketEnvironment,
        initial_guess: &HestonParameters,
        oracle: &O,
    ) -> Result<CalibrationResult, CalibrationError>
    where
        O: ImpliedVolOracle + ?Sized,
    {
        let started = Instant::now();
        self.config.validate()?;
        env.validate()?;
        surface.validate()?;
        if surface.len() < self.config.min_points {
            return Err(CalibrationError::insufficient_data(
                self.config.min_points,
                surface.len(),
            ));
        }
        initial_guess
            .validate()
            .map_err(CalibrationError::InvalidInitialGuess)?;

        let bounds = self.config.bounds;
        let start = bounds.clamp(initial_guess);
        if !bounds.contains(initial_guess) {
            warn!(
                guess = ?initial_guess.to_array(),
                projected = ?start,
                "initial guess outside bounds; projected"
            );
        }
        info!(initial = ?start, "Heston calibration started");

        let solver = LevenbergMarquardtSolver::new(self.config.lm);
        let lm = solver.try_solve_bounded(
            |p: &[f64]| self.residuals(surface, env, p, oracle),
            start.to_vec(),
            &bounds.to_array(),
        )?;

        let parameters = HestonParameters::from_slice(&lm.params)
            .map_err(|e| CalibrationError::Solver(SolverError::NumericalInstability(e.to_string())))?;
        let vol_errors = self.surface_errors(surface, env, &parameters, oracle)?;
        let diagnostics = CalibrationDiagnostics::new(
            lm.iterations,
            lm.residual_ss,
            lm.termination,
            started.elapsed(),
        )
        .with_vol_errors(vol_errors);

        let feller_satisfied = parameters.satisfies_feller();
        let feller_gap =
            parameters.sigma() * parameters.sigma() - 2.0 * parameters.kappa() * parameters.theta();
        match self.config.feller_policy {
            FellerPolicy::Strict if feller_gap > self.config.feller_tolerance => {
                return Err(CalibrationError::FellerViolation {
                    two_kappa_theta: 2.0 * parameters.kappa() * parameters.theta(),
                    sigma_squared: parameters.sigma() * parameters.sigma(),
                });
            }
            FellerPolicy::Soft if !feller_satisfied => {
                warn!(
                    feller_ratio = parameters.feller_ratio(),
                    "calibrated parameters violate the Feller condition"
                );
            }
            _ => {}
        }

        if !lm.converged {
            warn!(
                iterations = lm.iterations,
                termination = ?lm.termination,
                rmse = diagnostics.rmse,
                "Heston calibration did not converge"
            );
        }
        info!(
            params = ?parameters.to_array(),
            rmse = diagnostics.rmse,
            iterations = lm.iterations,
            converged = lm.converged,
            "Heston calibration finished"
        );

        Ok(CalibrationResult {
            parameters,
            converged: lm.converged,
            feller_satisfied,
            diagnostics,
        })
    }

    /// Model minus market implied vol at each surface point, in surface
    /// order. Points the oracle cannot price after retries are `NaN`.
    ///
    /// # Errors
    ///
    /// `Oracle` on a fatal oracle failure.
    pub fn surface_errors<O>(
        &self,
        surface: &VolSurface,
        env: &MarketEnvironment,
        params: &HestonParameters,
        oracle: &O,
    ) -> Result<Vec<f64>, CalibrationError>
    where
        O: ImpliedVolOracle + ?Sized,
    {
        let model = self.model_vols(surface, env, params, oracle)?;
        Ok(model
            .iter()
            .zip(surface.points())
            .map(|(vol, point)| vol.map_or(f64::NAN, |v| v - point.implied_vol))
            .collect())
    }

    fn residuals<O>(
        &self,
        surface: &VolSurface,
        env: &MarketEnvironment,
        p: &[f64],
        oracle: &O,
    ) -> Result<Vec<f64>, CalibrationError>
    where
        O: ImpliedVolOracle + ?Sized,
    {
        let strict = self.config.feller_policy == FellerPolicy::Strict;
        let n = surface.len() + usize::from(strict);

        // In-bounds points are always valid; anything else is penalised.
        let params = match HestonParameters::from_slice(p) {
            Ok(params) => params,
            Err(e) => {
                debug!(error = %e, "trial parameters invalid");
                return Ok(vec![self.config.oracle_penalty; n]);
            }
        };

        let model = self.model_vols(surface, env, &params, oracle)?;
        let mut r: Vec<f64> = model
            .iter()
            .zip(surface.points())
            .map(|(vol, point)| vol.map_or(self.config.oracle_penalty, |v| v - point.implied_vol))
            .collect();

        if strict {
            let gap = params.sigma() * params.sigma() - 2.0 * params.kappa() * params.theta();
            r.push(self.config.feller_penalty_weight * gap.max(0.0));
        }
        Ok(r)
    }

    fn model_vols<O>(
        &self,
        surface: &VolSurface,
        env: &MarketEnvironment,
        params: &HestonParameters,
        oracle: &O,
    ) -> Result<Vec<Option<f64>>, CalibrationError>
    where
        O: ImpliedVolOracle + ?Sized,
    {
        #[cfg(feature = "parallel")]
        let vols = surface
            .points()
            .par_iter()
            .map(|point| self.evaluate_point(oracle, params, env, point))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let vols = surface
            .points()
            .iter()
            .map(|point| self.evaluate_point(oracle, params, env, point))
            .collect();
        vols
    }

    /// One quote with retries. `Ok(None)` marks a point to penalise.
    fn evaluate_point<O>(
        &self,
        oracle: &O,
        params: &HestonParameters,
        env: &MarketEnvironment,
        point: &VolSurfacePoint,
    ) -> Result<Option<f64>, CalibrationError>
    where
        O: ImpliedVolOracle + ?Sized,
    {
        let mut attempt = 0;
        loop {
            match oracle.implied_vol(params, env, point.expiry, point.strike) {
                Ok(vol) if vol.is_finite() => return Ok(Some(vol)),
                Ok(vol) => {
                    debug!(expiry = point.expiry, strike = point.strike, vol, "non-finite model vol");
                    return Ok(None);
                }
                Err(OracleError::Retryable(message)) => {
                    if attempt >= self.config.oracle_retries {
                        debug!(
                            expiry = point.expiry,
                            strike = point.strike,
                            %message,
                            "oracle retries exhausted; penalising point"
                        );
                        return Ok(None);
                    }
                    attempt += 1;
                }
                Err(OracleError::Fatal(message)) => {
                    return Err(CalibrationError::oracle(point.expiry, point.strike, message));
                }
            }
        }
    }
}

/// Calibrate with default configuration.
pub fn calibrate_heston<O>(
    surface: &VolSurface,
    env: &MarketEnvironment,
    initial_guess: &HestonParameters,
    oracle: &O,
) -> Result<CalibrationResult, CalibrationError>
where
    O: ImpliedVolOracle + ?Sized,
{
    HestonCalibrator::new().calibrate(surface, env, initial_guess, oracle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_core::types::Date;
    use std::sync::Mutex;

    fn env() -> MarketEnvironment {
        MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
            .risk_free_rate(0.02)
            .build()
            .unwrap()
    }

    fn smile(p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64) -> f64 {
        let a = p.kappa() * t;
        let w = p.theta() + (p.v0() - p.theta()) * (1.0 - (-a).exp()) / a;
        let x = (k / env.spot()).ln();
        w.sqrt()
            + 0.5 * p.rho() * p.sigma() * x / w.sqrt()
            + 0.25 * p.sigma() * p.sigma() * (1.0 - p.rho() * p.rho()) * x * x / w
    }

    fn oracle(p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64) -> Result<f64, OracleError> {
        Ok(smile(p, env, t, k))
    }

    fn truth() -> HestonParameters {
        HestonParameters::new(0.04, 1.5, 0.06, 0.3, -0.6).unwrap()
    }

    fn surface_from(params: &HestonParameters) -> VolSurface {
        let env = env();
        let mut points = Vec::new();
        for &t in &[0.25, 0.5, 1.0, 2.0, 3.0] {
            for &k in &[80.0, 90.0, 100.0, 110.0, 120.0] {
                points.push(VolSurfacePoint::new(t, k, smile(params, &env, t, k)));
            }
        }
        VolSurface::new(points).unwrap()
    }

    #[test]
    fn test_default_bounds_valid() {
        let bounds = HestonBounds::default();
        assert!(bounds.validate().is_ok());
        assert_eq!(bounds.to_array()[HestonParamIndex::RHO], ParameterBounds::new(-0.99, 0.99));
        assert!(bounds.contains(&truth()));
    }

    #[test]
    fn test_bounds_outside_domain_rejected() {
        let bounds = HestonBounds {
            rho: ParameterBounds::new(-1.0, 0.5),
            ..Default::default()
        };
        assert!(matches!(
            bounds.validate(),
            Err(CalibrationError::InvalidBounds { param_name: "rho", .. })
        ));

        let bounds = HestonBounds {
            sigma: ParameterBounds::new(0.0, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            bounds.validate(),
            Err(CalibrationError::InvalidBounds { param_name: "sigma", .. })
        ));
    }

    #[test]
    fn test_recovers_parameters() {
        let surface = surface_from(&truth());
        let guess = HestonParameters::new(0.05, 1.0, 0.05, 0.4, -0.4).unwrap();
        let result = HestonCalibrator::new()
            .calibrate(&surface, &env(), &guess, &oracle)
            .unwrap();

        assert!(result.converged);
        assert!(result.feller_satisfied);
        for (fit, expected) in result.parameters.to_array().iter().zip(truth().to_array()) {
            assert_relative_eq!(*fit, expected, max_relative = 1e-3);
        }
        assert!(result.rmse() < 1e-6);
        assert_eq!(result.diagnostics.failed_points, 0);
    }

    #[test]
    fn test_guess_outside_bounds_is_projected() {
        let surface = surface_from(&truth());
        let guess = HestonParameters::new(0.05, 8.0, 0.05, 0.4, -0.4).unwrap();
        let config = HestonCalibrationConfig::default().with_lm_config(LMConfig::new(1e-10, 0));
        let result = HestonCalibrator::with_config(config)
            .calibrate(&surface, &env(), &guess, &oracle)
            .unwrap();
        assert_eq!(result.parameters.kappa(), 5.0);
        assert!(!result.converged);
    }

    #[test]
    fn test_insufficient_data() {
        let surface = VolSurface::new(vec![VolSurfacePoint::new(1.0, 100.0, 0.2)]).unwrap();
        let result = HestonCalibrator::new().calibrate(&surface, &env(), &truth(), &oracle);
        assert_eq!(result, Err(CalibrationError::insufficient_data(5, 1)));
    }

    #[test]
    fn test_fatal_oracle_aborts() {
        let surface = surface_from(&truth());
        let failing = |_: &HestonParameters, _: &MarketEnvironment, _t: f64, k: f64| {
            if k > 115.0 {
                Err(OracleError::Fatal("strike out of range".into()))
            } else {
                Ok(0.2)
            }
        };
        let result = HestonCalibrator::new().calibrate(&surface, &env(), &truth(), &failing);
        assert!(matches!(result, Err(CalibrationError::Oracle { strike, .. }) if strike == 120.0));
    }

    #[test]
    fn test_retryable_oracle_is_retried() {
        let surface = surface_from(&truth());
        let seen = Mutex::new(Vec::<(f64, f64)>::new());
        let flaky = |p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64| {
            // First request for each quote fails
            let mut seen = seen.lock().unwrap();
            if seen.contains(&(t, k)) {
                Ok(smile(p, env, t, k))
            } else {
                seen.push((t, k));
                Err(OracleError::Retryable("integrator".into()))
            }
        };
        let config = HestonCalibrationConfig::default().with_oracle_retries(3);
        let calibrator = HestonCalibrator::with_config(config);
        let errors = calibrator
            .surface_errors(&surface, &env(), &truth(), &flaky)
            .unwrap();
        assert!(errors.iter().all(|e| e.abs() < 1e-12));
    }

    #[test]
    fn test_exhausted_retries_penalise_point() {
        let surface = surface_from(&truth());
        let stubborn = |p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64| {
            if k == 80.0 && t == 0.25 {
                Err(OracleError::Retryable("no convergence".into()))
            } else {
                Ok(smile(p, env, t, k))
            }
        };
        let calibrator = HestonCalibrator::new();
        let errors = calibrator
            .surface_errors(&surface, &env(), &truth(), &stubborn)
            .unwrap();
        assert!(errors[0].is_nan());
        assert_eq!(errors.iter().filter(|e| e.is_nan()).count(), 1);

        let r = calibrator
            .residuals(&surface, &env(), &truth().to_array(), &stubborn)
            .unwrap();
        assert_eq!(r[0], calibrator.config().oracle_penalty);
    }

    #[test]
    fn test_strict_mode_adds_feller_residual() {
        let surface = surface_from(&truth());
        let config = HestonCalibrationConfig::default().with_feller_policy(FellerPolicy::Strict);
        let calibrator = HestonCalibrator::with_config(config);

        let violating = HestonParameters::new(0.04, 0.5, 0.04, 0.5, -0.6).unwrap();
        let r = calibrator
            .residuals(&surface, &env(), &violating.to_array(), &oracle)
            .unwrap();
        assert_eq!(r.len(), surface.len() + 1);
        assert_relative_eq!(r[surface.len()], 100.0 * (0.25 - 0.04), epsilon = 1e-12);

        let r = calibrator
            .residuals(&surface, &env(), &truth().to_array(), &oracle)
            .unwrap();
        assert_eq!(r[surface.len()], 0.0);
    }

    #[test]
    fn test_strict_mode_rejects_violating_solution() {
        let surface = surface_from(&truth());
        let violating = HestonParameters::new(0.04, 0.5, 0.04, 0.5, -0.6).unwrap();
        let config = HestonCalibrationConfig::default()
            .with_feller_policy(FellerPolicy::Strict)
            .with_lm_config(LMConfig::new(1e-10, 0));
        let result =
            HestonCalibrator::with_config(config).calibrate(&surface, &env(), &violating, &oracle);
        assert!(matches!(result, Err(CalibrationError::FellerViolation { .. })));
    }

    #[test]
    fn test_soft_mode_reports_violation() {
        let violating = HestonParameters::new(0.04, 0.5, 0.04, 0.5, -0.6).unwrap();
        let surface = surface_from(&violating);
        let result = HestonCalibrator::new()
            .calibrate(&surface, &env(), &violating, &oracle)
            .unwrap();
        assert!(!result.feller_satisfied);
        assert!(!result.is_success());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HestonCalibrationConfig {
            oracle_penalty: 0.0,
            ..Default::default()
        };
        let result = HestonCalibrator::with_config(config).calibrate(
            &surface_from(&truth()),
            &env(),
            &truth(),
            &oracle,
        );
        assert!(matches!(
            result,
            Err(CalibrationError::InvalidConfig { name: "oracle_penalty", .. })
        ));
    }
}
