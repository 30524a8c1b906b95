//! Observation schedule generation for structured notes.
//!
//! This module provides:
//! - [`ObservationSchedule`]: Strictly increasing observation dates
//! - [`ObservationScheduleBuilder`]: Forward generation from a start date
//! - [`Frequency`]: Observation frequency (Annual, SemiAnnual, Quarterly, Monthly)
//!
//! # Examples
//!
//! ```
//! use pricer_models::schedules::{Frequency, ObservationScheduleBuilder};
//! use pricer_core::types::Date;
//!
//! let schedule = ObservationScheduleBuilder::new()
//!     .start(Date::from_ymd(2024, 1, 15).unwrap())
//!     .end(Date::from_ymd(2026, 1, 15).unwrap())
//!     .frequency(Frequency::SemiAnnual)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(schedule.len(), 4);
//! ```

mod error;
mod frequency;
mod schedule;

pub use error::ScheduleError;
pub use frequency::Frequency;
pub use schedule::{ObservationSchedule, ObservationScheduleBuilder};
