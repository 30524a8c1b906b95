//! Instrument error types.
//!
//! Every variant names the product field and the invariant it violates, so
//! a rejected product tells the caller exactly what to fix.

use pricer_core::types::Date;
use thiserror::Error;

/// Product specification errors.
///
/// # Examples
/// ```
/// use pricer_models::instruments::InstrumentError;
///
/// let err = InstrumentError::InvalidStrike { strike: -100.0 };
/// assert!(format!("{}", err).contains("-100"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    /// No observation dates.
    #[error("Observation schedule is empty")]
    EmptySchedule,

    /// Observation dates not strictly increasing.
    #[error("Observation dates must be strictly increasing: {previous} followed by {next}")]
    NonIncreasingDates {
        /// Earlier position in the schedule
        previous: Date,
        /// Offending later position
        next: Date,
    },

    /// Invalid strike price (non-positive).
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Invalid notional amount.
    #[error("Invalid notional: N = {notional}")]
    InvalidNotional {
        /// The invalid notional value
        notional: f64,
    },

    /// Barrier not a positive number.
    #[error("Invalid {name} barrier: {value}")]
    InvalidBarrier {
        /// Which barrier
        name: &'static str,
        /// The invalid value
        value: f64,
    },

    /// Coupon rate not finite.
    #[error("Invalid coupon rate: {rate}")]
    InvalidCouponRate {
        /// The invalid rate
        rate: f64,
    },

    /// Autocall barrier below coupon barrier.
    #[error(
        "Autocall barrier {autocall} is below coupon barrier {coupon}; \
         enable allow_inverted_barriers if this is intended"
    )]
    InvertedBarriers {
        /// Autocall barrier (fraction of strike)
        autocall: f64,
        /// Coupon barrier (fraction of strike)
        coupon: f64,
    },

    /// Past fixing not a positive finite level.
    #[error("Invalid fixing {level} on {date}")]
    InvalidFixing {
        /// Fixing date
        date: Date,
        /// The invalid level
        level: f64,
    },

    /// Observation date on or before valuation without a fixing.
    #[error("Missing past fixing for observation date {date}")]
    MissingFixing {
        /// The uncovered observation date
        date: Date,
    },

    /// Fixing supplied for a date that is not a settled observation date.
    #[error("Unexpected fixing on {date}: not an observation date on or before valuation")]
    UnexpectedFixing {
        /// The date of the unexpected fixing
        date: Date,
    },
}
