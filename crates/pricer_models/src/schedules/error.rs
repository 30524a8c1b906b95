//! Schedule generation error types.

use pricer_core::types::{Date, DateError};
use thiserror::Error;

/// Errors that can occur during schedule generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// First observation must be on or before the final observation.
    #[error("First observation {first} is after final observation {last}")]
    InvalidDateRange {
        /// First observation date.
        first: Date,
        /// Final observation date.
        last: Date,
    },

    /// Missing required field in builder.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Unrecognised frequency string.
    #[error("Unknown frequency: {0}")]
    UnknownFrequency(String),

    /// Date arithmetic overflow.
    #[error("Date arithmetic failed: {0}")]
    Date(#[from] DateError),
}
