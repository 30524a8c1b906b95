//! Market data error types.
//!
//! This module provides structured error handling for market snapshots
//! and implied volatility surfaces.

use crate::types::Date;
use thiserror::Error;

/// Market data validation errors.
///
/// # Variants
///
/// - `InvalidSpot`: Non-positive or non-finite spot
/// - `InvalidRate`: Non-finite rate or dividend yield
/// - `InvalidStrike`: Non-positive strike on a surface point
/// - `InvalidExpiry`: Non-positive expiry on a surface point
/// - `InvalidVolatility`: Non-positive implied volatility
/// - `DuplicatePoint`: Same (expiry, strike) quoted twice
/// - `ExpiryBeforeValuation`: Expiry date not after the valuation date
/// - `InsufficientData`: Not enough points on the surface
///
/// # Examples
///
/// ```
/// use pricer_core::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidSpot { spot: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Spot is not a positive finite number.
    #[error("Invalid spot: S = {spot}")]
    InvalidSpot {
        /// The invalid spot value
        spot: f64,
    },

    /// Rate or yield is not finite.
    #[error("Invalid {name}: {value}")]
    InvalidRate {
        /// Which rate was invalid
        name: &'static str,
        /// The invalid value
        value: f64,
    },

    /// Invalid strike price (non-positive).
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Invalid expiry (non-positive).
    #[error("Invalid expiry: T = {expiry}")]
    InvalidExpiry {
        /// The invalid expiry value
        expiry: f64,
    },

    /// Implied volatility is not a positive finite number.
    #[error("Invalid implied volatility {vol} at T = {expiry}, K = {strike}")]
    InvalidVolatility {
        /// Expiry of the offending point
        expiry: f64,
        /// Strike of the offending point
        strike: f64,
        /// The invalid volatility
        vol: f64,
    },

    /// A (expiry, strike) pair appears more than once.
    #[error("Duplicate surface point at T = {expiry}, K = {strike}")]
    DuplicatePoint {
        /// Expiry of the duplicate
        expiry: f64,
        /// Strike of the duplicate
        strike: f64,
    },

    /// Expiry date on or before the valuation date.
    #[error("Expiry {expiry} is not after valuation date {valuation}")]
    ExpiryBeforeValuation {
        /// The expiry date
        expiry: Date,
        /// The valuation date
        valuation: Date,
    },

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_strike_display() {
        let err = MarketDataError::InvalidStrike { strike: -100.0 };
        assert_eq!(format!("{}", err), "Invalid strike: K = -100");
    }

    #[test]
    fn test_invalid_rate_display() {
        let err = MarketDataError::InvalidRate {
            name: "risk-free rate",
            value: f64::NAN,
        };
        assert_eq!(format!("{}", err), "Invalid risk-free rate: NaN");
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = MarketDataError::InsufficientData { got: 1, need: 5 };
        assert_eq!(format!("{}", err), "Insufficient data: got 1, need 5");
    }
}
