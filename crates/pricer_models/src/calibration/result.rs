//! Calibration result types.
//!
//! A result always carries the best parameters found. Whether the solver
//! met a tolerance and whether the parameters satisfy Feller are separate
//! flags, so a caller can tell "did not converge" from "converged outside
//! the Feller region".

use std::time::Duration;

use pricer_core::math::solvers::LMTermination;

use crate::models::HestonParameters;

/// Calibration diagnostics.
///
/// Contains detailed information about the calibration process
/// for analysis and debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationDiagnostics {
    /// Number of solver iterations performed
    pub iterations: usize,
    /// Final objective value: sum of squared residuals, penalties included
    pub final_residual: f64,
    /// Root mean squared implied-vol error over priced points
    pub rmse: f64,
    /// Maximum absolute implied-vol error over priced points
    pub max_error: f64,
    /// Wall-clock duration
    pub duration: Duration,
    /// Why the solver stopped
    pub termination: LMTermination,
    /// Model minus market vol per surface point, in surface order;
    /// `NaN` where the oracle failed at the final parameters
    pub vol_errors: Vec<f64>,
    /// Points the oracle could not price at the final parameters
    pub failed_points: usize,
}

impl CalibrationDiagnostics {
    /// Create new diagnostics with basic information.
    pub fn new(
        iterations: usize,
        final_residual: f64,
        termination: LMTermination,
        duration: Duration,
    ) -> Self {
        Self {
            iterations,
            final_residual,
            rmse: f64::NAN,
            max_error: f64::NAN,
            duration,
            termination,
            vol_errors: Vec::new(),
            failed_points: 0,
        }
    }

    /// Set per-point vol errors, deriving RMSE, max error and the failure count.
    pub fn with_vol_errors(mut self, errors: Vec<f64>) -> Self {
        let priced: Vec<f64> = errors.iter().copied().filter(|e| e.is_finite()).collect();
        self.failed_points = errors.len() - priced.len();
        if !priced.is_empty() {
            let n = priced.len() as f64;
            self.rmse = (priced.iter().map(|e| e * e).sum::<f64>() / n).sqrt();
            self.max_error = priced.iter().map(|e| e.abs()).fold(0.0_f64, f64::max);
        }
        self.vol_errors = errors;
        self
    }

    /// Check if calibration quality is acceptable.
    ///
    /// # Arguments
    ///
    /// * `tolerance` - Maximum acceptable RMSE, in vol units
    pub fn is_quality_acceptable(&self, tolerance: f64) -> bool {
        self.failed_points == 0 && self.rmse <= tolerance
    }
}

/// Calibration result.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    /// Calibrated parameters; always inside the configured bounds
    pub parameters: HestonParameters,
    /// Whether the solver met one of its tolerances
    pub converged: bool,
    /// Whether `2 kappa theta >= sigma^2` at `parameters`
    pub feller_satisfied: bool,
    /// Calibration diagnostics
    pub diagnostics: CalibrationDiagnostics,
}

impl CalibrationResult {
    /// Get the calibrated parameters.
    pub fn params(&self) -> &HestonParameters {
        &self.parameters
    }

    /// Get the calibration diagnostics.
    pub fn diagnostics(&self) -> &CalibrationDiagnostics {
        &self.diagnostics
    }

    /// Converged and Feller-consistent.
    pub fn is_success(&self) -> bool {
        self.converged && self.feller_satisfied
    }

    /// Get the implied-vol RMSE of the calibration.
    pub fn rmse(&self) -> f64 {
        self.diagnostics.rmse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag() -> CalibrationDiagnostics {
        CalibrationDiagnostics::new(
            12,
            1e-8,
            LMTermination::ResidualTolerance,
            Duration::from_millis(40),
        )
    }

    #[test]
    fn test_diagnostics_new() {
        let d = diag();
        assert_eq!(d.iterations, 12);
        assert_eq!(d.final_residual, 1e-8);
        assert!(d.rmse.is_nan());
        assert!(d.vol_errors.is_empty());
    }

    #[test]
    fn test_vol_errors_skip_failed_points() {
        let d = diag().with_vol_errors(vec![0.01, -0.03, f64::NAN, 0.0]);
        assert_eq!(d.failed_points, 1);
        assert!((d.max_error - 0.03).abs() < 1e-15);
        let expected = ((0.0001 + 0.0009) / 3.0_f64).sqrt();
        assert!((d.rmse - expected).abs() < 1e-15);
        assert!(!d.is_quality_acceptable(1.0));
    }

    #[test]
    fn test_success_requires_feller() {
        let params = HestonParameters::new(0.04, 0.5, 0.04, 0.5, -0.7).unwrap();
        let result = CalibrationResult {
            parameters: params,
            converged: true,
            feller_satisfied: params.satisfies_feller(),
            diagnostics: diag().with_vol_errors(vec![0.001]),
        };
        assert!(!result.is_success());
        assert!(result.diagnostics().is_quality_acceptable(0.01));
        assert_eq!(result.params(), &params);
    }
}
