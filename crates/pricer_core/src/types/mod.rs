//! Core time and error types.
//!
//! This module provides:
//! - `time`: `Date` and `DayCountConvention`, the calendar collaborator used
//!   uniformly by discounting and the simulation grid
//! - `error`: Structured error types for date and solver operations
//!
//! # Re-exports
//!
//! - [`Date`], [`DayCountConvention`] from `time`
//! - [`DateError`], [`SolverError`] from `error`

pub mod error;
pub mod time;

pub use error::{DateError, SolverError};
pub use time::{Date, DayCountConvention};
