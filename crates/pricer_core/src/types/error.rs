//! Error types for the foundation layer.
//!
//! This module provides:
//! - `DateError`: Errors from date construction, parsing and arithmetic
//! - `SolverError`: Errors from the least-squares solver

use std::fmt;
use thiserror::Error;

/// Date-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2024, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2024-2-30");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse date string.
    ParseError(String),

    /// Month arithmetic left the representable calendar range.
    Overflow {
        /// Number of months that were being added
        months: u32,
    },

    /// Unrecognised day count convention name.
    UnknownConvention(String),
}

impl fmt::Display for DateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateError::InvalidDate { year, month, day } => {
                write!(f, "Invalid date: {}-{}-{}", year, month, day)
            }
            DateError::ParseError(msg) => write!(f, "Date parse error: {}", msg),
            DateError::Overflow { months } => {
                write!(f, "Date overflow when adding {} months", months)
            }
            DateError::UnknownConvention(name) => {
                write!(f, "Unknown day count convention: {}", name)
            }
        }
    }
}

impl std::error::Error for DateError {}

/// Least-squares solver errors.
///
/// Running out of iterations is not an error: the solver returns its best
/// estimate with `converged == false`. These variants describe inputs the
/// solver cannot work with at all.
///
/// # Examples
/// ```
/// use pricer_core::types::SolverError;
///
/// let err = SolverError::DimensionMismatch { expected: 5, actual: 4 };
/// assert!(format!("{}", err).contains("expected 5"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Parameter and bounds vectors disagree in length.
    #[error("Dimension mismatch: expected {expected} bounds, got {actual}")]
    DimensionMismatch {
        /// Number of parameters
        expected: usize,
        /// Number of bounds supplied
        actual: usize,
    },

    /// A bound pair is empty or not ordered.
    #[error("Invalid bounds for parameter {index}: [{min}, {max}]")]
    InvalidBounds {
        /// Parameter index
        index: usize,
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Numerical instability (empty problem, non-finite residuals at the start point).
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}
