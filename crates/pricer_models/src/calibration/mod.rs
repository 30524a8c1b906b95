//! Heston calibration to an implied volatility surface.
//!
//! - [`HestonCalibrator`]: bounded Levenberg-Marquardt fit of the five
//!   Heston parameters
//! - [`ImpliedVolOracle`]: caller-supplied model implied vol
//!   `(params, env, expiry, strike) -> vol`
//! - [`CalibrationResult`]: parameters, convergence and Feller flags, diagnostics
//! - [`CalibrationError`]: failures other than non-convergence
//!
//! # Architecture
//!
//! ```text
//! VolSurface ──► HestonCalibrator ──► LM solver ──► CalibrationResult
//!                      │    ▲
//!          trial params ▼    │ model vols
//!                 ImpliedVolOracle
//! ```
//!
//! The oracle is called with trial parameters only; no model object is
//! shared or mutated between solver iterations.

mod error;
pub mod heston;
mod oracle;
mod result;

pub use error::CalibrationError;
pub use heston::{
    calibrate_heston, FellerPolicy, HestonBounds, HestonCalibrationConfig, HestonCalibrator,
};
pub use oracle::{ImpliedVolOracle, OracleError};
pub use result::{CalibrationDiagnostics, CalibrationResult};
