//! Calibration error types.
//!
//! Non-convergence is not an error: the calibrator returns its best
//! parameters with `converged == false` and full diagnostics.

use pricer_core::market_data::MarketDataError;
use pricer_core::types::SolverError;
use thiserror::Error;

use crate::models::HestonError;

/// Calibration error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Fewer surface points than the calibration needs.
    #[error("Insufficient market data (required: {required}, provided: {provided})")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual data points provided
        provided: usize,
    },

    /// Surface or market snapshot failed validation.
    #[error("Invalid market data: {0}")]
    InvalidSurface(#[from] MarketDataError),

    /// A parameter interval is empty, NaN, or leaves the model's domain.
    #[error("Invalid bounds for {param_name}: [{lower}, {upper}]")]
    InvalidBounds {
        /// Name of the parameter
        param_name: &'static str,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// A calibration setting is out of range.
    #[error("Invalid calibration setting {name} = {value}")]
    InvalidConfig {
        /// Setting name
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// The starting point is not a valid parameter set.
    #[error("Invalid initial guess: {0}")]
    InvalidInitialGuess(HestonError),

    /// The pricing oracle reported a fatal failure.
    #[error("Oracle failed at expiry {expiry}, strike {strike}: {message}")]
    Oracle {
        /// Expiry of the failing quote (years)
        expiry: f64,
        /// Strike of the failing quote
        strike: f64,
        /// Oracle's description
        message: String,
    },

    /// Strict Feller mode ended on a violating parameter set.
    #[error(
        "Calibrated parameters violate the Feller condition: 2*kappa*theta = {two_kappa_theta:.6e} < sigma^2 = {sigma_squared:.6e}"
    )]
    FellerViolation {
        /// `2 kappa theta` at the solution
        two_kappa_theta: f64,
        /// `sigma^2` at the solution
        sigma_squared: f64,
    },

    /// The optimiser rejected its inputs or hit a numerical failure.
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

impl CalibrationError {
    /// Create an insufficient data error.
    pub fn insufficient_data(required: usize, provided: usize) -> Self {
        CalibrationError::InsufficientData { required, provided }
    }

    /// Create an invalid bounds error.
    pub fn invalid_bounds(param_name: &'static str, lower: f64, upper: f64) -> Self {
        CalibrationError::InvalidBounds {
            param_name,
            lower,
            upper,
        }
    }

    /// Create a fatal oracle error.
    pub fn oracle(expiry: f64, strike: f64, message: impl Into<String>) -> Self {
        CalibrationError::Oracle {
            expiry,
            strike,
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors might succeed with a different initial guess
    /// or solver settings.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CalibrationError::FellerViolation { .. }
                | CalibrationError::Solver(SolverError::NumericalInstability(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_error() {
        let err = CalibrationError::insufficient_data(5, 3);
        let msg = format!("{}", err);
        assert!(msg.contains("5"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn test_oracle_error_message() {
        let err = CalibrationError::oracle(0.5, 110.0, "integration diverged");
        let msg = err.to_string();
        assert!(msg.contains("110"));
        assert!(msg.contains("integration diverged"));
    }

    #[test]
    fn test_surface_error_conversion() {
        let err: CalibrationError = MarketDataError::InvalidStrike { strike: -1.0 }.into();
        assert!(matches!(err, CalibrationError::InvalidSurface(_)));
    }

    #[test]
    fn test_is_recoverable() {
        let feller = CalibrationError::FellerViolation {
            two_kappa_theta: 0.01,
            sigma_squared: 0.09,
        };
        assert!(feller.is_recoverable());
        assert!(CalibrationError::Solver(SolverError::NumericalInstability("NaN".into()))
            .is_recoverable());
        assert!(!CalibrationError::insufficient_data(5, 3).is_recoverable());
        assert!(!CalibrationError::oracle(1.0, 100.0, "fatal").is_recoverable());
    }
}
