//! Immutable market snapshot shared by the simulator, payoff discounting and
//! the calibration oracle.

use super::error::MarketDataError;
use crate::types::{Date, DayCountConvention};

/// Market state at the valuation date.
///
/// Rates are flat and continuously compounded. The snapshot owns no
/// mutable state and is shared read-only across every simulated path and
/// every calibration objective evaluation.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::{Date, DayCountConvention};
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 1).unwrap(), 100.0)
///     .risk_free_rate(0.02)
///     .dividend_yield(0.01)
///     .day_count(DayCountConvention::Actual365Fixed)
///     .build()
///     .unwrap();
///
/// assert_eq!(env.spot(), 100.0);
/// assert!((env.forward(1.0) - 100.0 * (0.01_f64).exp()).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MarketEnvironment {
    valuation_date: Date,
    spot: f64,
    risk_free_rate: f64,
    dividend_yield: f64,
    day_count: DayCountConvention,
}

impl MarketEnvironment {
    /// Start building an environment for a valuation date and spot level.
    pub fn builder(valuation_date: Date, spot: f64) -> MarketEnvironmentBuilder {
        MarketEnvironmentBuilder {
            valuation_date,
            spot,
            risk_free_rate: 0.0,
            dividend_yield: 0.0,
            day_count: DayCountConvention::default(),
        }
    }

    /// Valuation date.
    #[inline]
    pub fn valuation_date(&self) -> Date {
        self.valuation_date
    }

    /// Spot level of the underlying.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Flat continuously-compounded risk-free rate `r`.
    #[inline]
    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Flat continuous dividend yield `q`.
    #[inline]
    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }

    /// Day count convention used for every year fraction.
    #[inline]
    pub fn day_count(&self) -> DayCountConvention {
        self.day_count
    }

    /// Year fraction from the valuation date to `date`.
    #[inline]
    pub fn time_to(&self, date: Date) -> f64 {
        self.day_count.year_fraction(self.valuation_date, date)
    }

    /// Discount factor `exp(-r t)` for a time in years.
    #[inline]
    pub fn discount_factor(&self, t: f64) -> f64 {
        (-self.risk_free_rate * t).exp()
    }

    /// Discount factor from `date` back to the valuation date.
    #[inline]
    pub fn discount_factor_to(&self, date: Date) -> f64 {
        self.discount_factor(self.time_to(date))
    }

    /// Forward level `S exp((r - q) t)`.
    #[inline]
    pub fn forward(&self, t: f64) -> f64 {
        self.spot * ((self.risk_free_rate - self.dividend_yield) * t).exp()
    }

    /// Check the snapshot invariants.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        if !self.spot.is_finite() || self.spot <= 0.0 {
            return Err(MarketDataError::InvalidSpot { spot: self.spot });
        }
        if !self.risk_free_rate.is_finite() {
            return Err(MarketDataError::InvalidRate {
                name: "risk-free rate",
                value: self.risk_free_rate,
            });
        }
        if !self.dividend_yield.is_finite() {
            return Err(MarketDataError::InvalidRate {
                name: "dividend yield",
                value: self.dividend_yield,
            });
        }
        Ok(())
    }
}

/// Builder for [`MarketEnvironment`].
#[derive(Debug, Clone)]
pub struct MarketEnvironmentBuilder {
    valuation_date: Date,
    spot: f64,
    risk_free_rate: f64,
    dividend_yield: f64,
    day_count: DayCountConvention,
}

impl MarketEnvironmentBuilder {
    /// Set the flat risk-free rate (default 0).
    pub fn risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Set the flat dividend yield (default 0).
    pub fn dividend_yield(mut self, yield_: f64) -> Self {
        self.dividend_yield = yield_;
        self
    }

    /// Set the day count convention (default ACT/360).
    pub fn day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Build and validate the environment.
    pub fn build(self) -> Result<MarketEnvironment, MarketDataError> {
        let env = MarketEnvironment {
            valuation_date: self.valuation_date,
            spot: self.spot,
            risk_free_rate: self.risk_free_rate,
            dividend_yield: self.dividend_yield,
            day_count: self.day_count,
        };
        env.validate()?;
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn valuation() -> Date {
        Date::from_ymd(2024, 7, 20).unwrap()
    }

    #[test]
    fn test_defaults() {
        let env = MarketEnvironment::builder(valuation(), 100.0).build().unwrap();
        assert_eq!(env.risk_free_rate(), 0.0);
        assert_eq!(env.dividend_yield(), 0.0);
        assert_eq!(env.day_count(), DayCountConvention::Actual360);
        assert_eq!(env.discount_factor(3.0), 1.0);
    }

    #[test]
    fn test_discount_factor_to_date_uses_day_count() {
        let env = MarketEnvironment::builder(valuation(), 100.0)
            .risk_free_rate(0.02)
            .build()
            .unwrap();
        let payment = Date::from_ymd(2025, 7, 20).unwrap();
        let expected = (-0.02 * 365.0 / 360.0_f64).exp();
        assert_relative_eq!(env.discount_factor_to(payment), expected, epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_non_positive_spot() {
        let result = MarketEnvironment::builder(valuation(), 0.0).build();
        assert!(matches!(result, Err(MarketDataError::InvalidSpot { .. })));
    }

    #[test]
    fn test_rejects_nan_rate() {
        let result = MarketEnvironment::builder(valuation(), 100.0)
            .risk_free_rate(f64::NAN)
            .build();
        assert!(matches!(result, Err(MarketDataError::InvalidRate { .. })));
    }
}
