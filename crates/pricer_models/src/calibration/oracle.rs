//! Model implied-volatility oracle consumed by the calibrator.
//!
//! The calibrator never prices options itself. It asks an
//! [`ImpliedVolOracle`] for the model implied volatility of each quote at
//! a trial parameter set; the oracle is typically a semi-analytic Heston
//! pricer followed by a Black inversion, supplied by the caller.

use pricer_core::market_data::MarketEnvironment;
use thiserror::Error;

use crate::models::HestonParameters;

/// Failure reported by an oracle for one (expiry, strike).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Transient failure, e.g. an integrator that did not converge at
    /// these parameters. The calibrator retries and, if the failure
    /// persists, penalises the point instead of aborting.
    #[error("retryable oracle failure: {0}")]
    Retryable(String),

    /// The oracle cannot price this quote at all; calibration aborts.
    #[error("fatal oracle failure: {0}")]
    Fatal(String),
}

impl OracleError {
    /// True for [`OracleError::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Retryable(_))
    }
}

/// Pure function `(params, env, expiry, strike) -> model implied vol`.
///
/// Implementations must be deterministic and free of side effects visible
/// to other calls: the calibrator may evaluate points in any order and in
/// parallel. Closures with the matching signature implement the trait.
///
/// # Examples
///
/// ```
/// use pricer_models::calibration::{ImpliedVolOracle, OracleError};
/// use pricer_models::models::HestonParameters;
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::Date;
///
/// // Long-run vol as a flat surface
/// let flat = |p: &HestonParameters, _: &MarketEnvironment, _t: f64, _k: f64| {
///     Ok::<_, OracleError>(p.theta().sqrt())
/// };
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
///     .build()
///     .unwrap();
/// let params = HestonParameters::new(0.04, 1.5, 0.09, 0.3, -0.5).unwrap();
/// let vol = flat.implied_vol(&params, &env, 1.0, 100.0).unwrap();
/// assert!((vol - 0.3).abs() < 1e-12);
/// ```
pub trait ImpliedVolOracle: Sync {
    /// Model implied volatility for a quote.
    ///
    /// `expiry` is a year fraction measured with the environment's day count.
    fn implied_vol(
        &self,
        params: &HestonParameters,
        env: &MarketEnvironment,
        expiry: f64,
        strike: f64,
    ) -> Result<f64, OracleError>;
}

impl<F> ImpliedVolOracle for F
where
    F: Fn(&HestonParameters, &MarketEnvironment, f64, f64) -> Result<f64, OracleError> + Sync,
{
    #[inline]
    fn implied_vol(
        &self,
        params: &HestonParameters,
        env: &MarketEnvironment,
        expiry: f64,
        strike: f64,
    ) -> Result<f64, OracleError> {
        self(params, env, expiry, strike)
    }
}
