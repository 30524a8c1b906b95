//! Heston stochastic volatility model.
//!
//! The Heston model is described by the SDE system:
//! ```text
//! dS = (r - q) * S * dt + sqrt(v) * S * dW_S
//! dv = kappa * (theta - v) * dt + sigma * sqrt(v) * dW_v
//! E[dW_S * dW_v] = rho * dt
//! ```
//! where:
//! - S = asset level
//! - v = instantaneous variance
//! - kappa = mean-reversion speed
//! - theta = long-run variance
//! - sigma = volatility of variance (vol-of-vol)
//! - rho = asset/variance correlation
//!
//! ## Feller condition
//!
//! The variance process stays strictly positive in continuous time when
//! ```text
//! 2 * kappa * theta >= sigma^2
//! ```
//!
//! ## Milstein discretisation
//!
//! [`HestonModel::milstein_step`] advances one step with the Milstein
//! scheme for the variance and a log-Euler step for the asset. Variance is
//! floored at zero at the start of every step (absorption) and capped at a
//! finite ceiling so that `sqrt(v * dt)` never overflows.
//!
//! ## Example
//!
//! ```
//! use pricer_models::models::heston::{HestonModel, HestonParameters};
//!
//! let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
//! assert!(params.satisfies_feller());
//!
//! let model = HestonModel::new(params).unwrap();
//! let (s, v) = model.milstein_step(100.0, 0.04, 1.0 / 252.0, 0.0, 0.0, 0.02);
//! assert!(s > 0.0 && v >= 0.0);
//! ```

use thiserror::Error;
use tracing::warn;

/// Default cap on the simulated variance.
///
/// A variance of 1e4 is a volatility of 10,000%; anything above is
/// numerical runaway, not a market state.
pub const DEFAULT_VARIANCE_CEILING: f64 = 1.0e4;

/// Heston model error type.
///
/// Every variant identifies the parameter and the violated invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HestonError {
    /// Initial variance not strictly positive.
    #[error("Invalid initial variance: v0 = {0} (must be positive)")]
    InvalidV0(f64),

    /// Mean-reversion speed not strictly positive.
    #[error("Invalid mean-reversion speed: kappa = {0} (must be positive)")]
    InvalidKappa(f64),

    /// Long-run variance not strictly positive.
    #[error("Invalid long-run variance: theta = {0} (must be positive)")]
    InvalidTheta(f64),

    /// Vol-of-vol not strictly positive.
    #[error("Invalid vol-of-vol: sigma = {0} (must be positive)")]
    InvalidSigma(f64),

    /// Correlation outside the open interval (-1, 1).
    #[error("Invalid correlation: rho = {0} (must lie in (-1, 1))")]
    InvalidRho(f64),

    /// Feller condition `2 kappa theta >= sigma^2` violated.
    #[error("Feller condition violated: 2*kappa*theta = {two_kappa_theta} < sigma^2 = {sigma_squared}")]
    FellerViolation {
        /// Left-hand side `2 kappa theta`
        two_kappa_theta: f64,
        /// Right-hand side `sigma^2`
        sigma_squared: f64,
    },

    /// Variance ceiling not strictly positive.
    #[error("Invalid variance ceiling: {0} (must be positive and finite)")]
    InvalidVarianceCeiling(f64),
}

/// Position of each parameter in the flat vector used by calibration.
pub struct HestonParamIndex;

impl HestonParamIndex {
    /// Initial variance.
    pub const V0: usize = 0;
    /// Mean-reversion speed.
    pub const KAPPA: usize = 1;
    /// Long-run variance.
    pub const THETA: usize = 2;
    /// Vol-of-vol.
    pub const SIGMA: usize = 3;
    /// Correlation.
    pub const RHO: usize = 4;
    /// Number of parameters.
    pub const COUNT: usize = 5;
}

/// Validated Heston parameter set.
///
/// Construction enforces positivity and `-1 < rho < 1`. The Feller
/// condition is reported by [`satisfies_feller`](Self::satisfies_feller)
/// and enforced by [`validate_strict`](Self::validate_strict) rather than
/// at construction, because calibration may legitimately land outside it.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct HestonParameters {
    v0: f64,
    kappa: f64,
    theta: f64,
    sigma: f64,
    rho: f64,
}

impl HestonParameters {
    /// Create and validate a parameter set.
    ///
    /// # Arguments
    ///
    /// * `v0` - Initial variance (> 0)
    /// * `kappa` - Mean-reversion speed (> 0)
    /// * `theta` - Long-run variance (> 0)
    /// * `sigma` - Vol-of-vol (> 0)
    /// * `rho` - Asset/variance correlation, in (-1, 1)
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant. NaN fails every check.
    pub fn new(v0: f64, kappa: f64, theta: f64, sigma: f64, rho: f64) -> Result<Self, HestonError> {
        let params = Self {
            v0,
            kappa,
            theta,
            sigma,
            rho,
        };
        params.validate()?;
        Ok(params)
    }

    /// Create from a vector ordered as [`HestonParamIndex`].
    pub fn from_slice(values: &[f64]) -> Result<Self, HestonError> {
        let get = |i: usize| values.get(i).copied().unwrap_or(f64::NAN);
        Self::new(
            get(HestonParamIndex::V0),
            get(HestonParamIndex::KAPPA),
            get(HestonParamIndex::THETA),
            get(HestonParamIndex::SIGMA),
            get(HestonParamIndex::RHO),
        )
    }

    /// Flatten to a vector ordered as [`HestonParamIndex`].
    pub fn to_array(&self) -> [f64; HestonParamIndex::COUNT] {
        [self.v0, self.kappa, self.theta, self.sigma, self.rho]
    }

    /// Check positivity and correlation bounds.
    pub fn validate(&self) -> Result<(), HestonError> {
        if !(self.v0 > 0.0 && self.v0.is_finite()) {
            return Err(HestonError::InvalidV0(self.v0));
        }
        if !(self.kappa > 0.0 && self.kappa.is_finite()) {
            return Err(HestonError::InvalidKappa(self.kappa));
        }
        if !(self.theta > 0.0 && self.theta.is_finite()) {
            return Err(HestonError::InvalidTheta(self.theta));
        }
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(HestonError::InvalidSigma(self.sigma));
        }
        if !(self.rho > -1.0 && self.rho < 1.0) {
            return Err(HestonError::InvalidRho(self.rho));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) plus the Feller condition.
    pub fn validate_strict(&self) -> Result<(), HestonError> {
        self.validate()?;
        if !self.satisfies_feller() {
            return Err(HestonError::FellerViolation {
                two_kappa_theta: 2.0 * self.kappa * self.theta,
                sigma_squared: self.sigma * self.sigma,
            });
        }
        Ok(())
    }

    /// True when `2 kappa theta >= sigma^2`.
    #[inline]
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.sigma * self.sigma
    }

    /// Feller ratio `2 kappa theta / sigma^2`; at least 1 when the condition holds.
    #[inline]
    pub fn feller_ratio(&self) -> f64 {
        2.0 * self.kappa * self.theta / (self.sigma * self.sigma)
    }

    /// Initial variance.
    #[inline]
    pub fn v0(&self) -> f64 {
        self.v0
    }

    /// Mean-reversion speed.
    #[inline]
    pub fn kappa(&self) -> f64 {
        self.kappa
    }

    /// Long-run variance.
    #[inline]
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Vol-of-vol.
    #[inline]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Asset/variance correlation.
    #[inline]
    pub fn rho(&self) -> f64 {
        self.rho
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HestonParameters {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct Raw {
            v0: f64,
            kappa: f64,
            theta: f64,
            sigma: f64,
            rho: f64,
        }
        let raw = Raw::deserialize(deserializer)?;
        HestonParameters::new(raw.v0, raw.kappa, raw.theta, raw.sigma, raw.rho)
            .map_err(serde::de::Error::custom)
    }
}

/// Heston dynamics ready for path simulation.
///
/// Holds an immutable parameter set and the variance ceiling. One model is
/// built per pricing call and shared read-only by all workers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonModel {
    params: HestonParameters,
    variance_ceiling: f64,
}

impl HestonModel {
    /// Build a model, failing fast on a Feller violation.
    pub fn new(params: HestonParameters) -> Result<Self, HestonError> {
        params.validate_strict()?;
        Ok(Self {
            params,
            variance_ceiling: DEFAULT_VARIANCE_CEILING,
        })
    }

    /// Build a model that accepts a Feller-violating parameter set.
    ///
    /// Absorption at zero keeps the discretisation well defined; the
    /// violation is logged.
    pub fn allowing_feller_violation(params: HestonParameters) -> Result<Self, HestonError> {
        params.validate()?;
        if !params.satisfies_feller() {
            warn!(
                feller_ratio = params.feller_ratio(),
                "simulating Heston parameters that violate the Feller condition"
            );
        }
        Ok(Self {
            params,
            variance_ceiling: DEFAULT_VARIANCE_CEILING,
        })
    }

    /// Replace the variance ceiling.
    pub fn with_variance_ceiling(mut self, ceiling: f64) -> Result<Self, HestonError> {
        if !(ceiling > 0.0 && ceiling.is_finite()) {
            return Err(HestonError::InvalidVarianceCeiling(ceiling));
        }
        self.variance_ceiling = ceiling;
        Ok(self)
    }

    /// Model parameters.
    #[inline]
    pub fn params(&self) -> &HestonParameters {
        &self.params
    }

    /// Cap applied to the simulated variance.
    #[inline]
    pub fn variance_ceiling(&self) -> f64 {
        self.variance_ceiling
    }

    /// Advance `(S, v)` by one step of length `dt`.
    ///
    /// `z1` drives the asset and `z2` the variance; the caller supplies
    /// them already correlated. `drift` is `r - q`.
    ///
    /// ```text
    /// v+      = clamp(v, 0, ceiling)
    /// v_next  = v+ + kappa (theta - v+) dt + sigma sqrt(v+ dt) z2 + sigma^2/4 dt (z2^2 - 1)
    /// v_next  = clamp(v_next, 0, ceiling)
    /// S_next  = S exp((drift - v+/2) dt + sqrt(v+ dt) z1)
    /// ```
    ///
    /// The caller is responsible for `dt > 0` and for checking the result
    /// for non-finite values.
    #[inline]
    pub fn milstein_step(
        &self,
        asset: f64,
        variance: f64,
        dt: f64,
        z1: f64,
        z2: f64,
        drift: f64,
    ) -> (f64, f64) {
        let HestonParameters {
            kappa, theta, sigma, ..
        } = self.params;

        let v = variance.max(0.0).min(self.variance_ceiling);
        let sqrt_v_dt = (v * dt).sqrt();

        let v_next = v + kappa * (theta - v) * dt
            + sigma * sqrt_v_dt * z2
            + 0.25 * sigma * sigma * dt * (z2 * z2 - 1.0);
        let v_next = v_next.max(0.0).min(self.variance_ceiling);

        let s_next = asset * ((drift - 0.5 * v) * dt + sqrt_v_dt * z1).exp();

        (s_next, v_next)
    }
}
