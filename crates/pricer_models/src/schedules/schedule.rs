//! Observation schedule generation.

use pricer_core::types::Date;

use super::error::ScheduleError;
use super::frequency::Frequency;

/// Strictly increasing observation dates of a structured note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationSchedule {
    dates: Vec<Date>,
}

impl ObservationSchedule {
    /// Observation dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Consume the schedule, returning its dates.
    pub fn into_dates(self) -> Vec<Date> {
        self.dates
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// True when there are no observations.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Final observation date.
    pub fn last(&self) -> Option<Date> {
        self.dates.last().copied()
    }
}

/// Builder generating dates forward from a start date.
///
/// Observation `k` is `start + k * frequency.months()` months, computed from
/// the start date each time so month-end clipping does not accumulate.
/// The end date is always the final observation; if it does not fall on a
/// regular date the last period is a short stub. No business-day
/// adjustment is applied.
///
/// # Examples
///
/// ```
/// use pricer_models::schedules::{Frequency, ObservationScheduleBuilder};
/// use pricer_core::types::Date;
///
/// let start = Date::from_ymd(2024, 7, 20).unwrap();
/// let schedule = ObservationScheduleBuilder::new()
///     .start(start)
///     .tenor_months(60)
///     .frequency(Frequency::SemiAnnual)
///     .build()
///     .unwrap();
///
/// assert_eq!(schedule.len(), 10);
/// assert_eq!(schedule.dates()[0], Date::from_ymd(2025, 1, 20).unwrap());
/// assert_eq!(schedule.last(), Some(Date::from_ymd(2029, 7, 20).unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObservationScheduleBuilder {
    start: Option<Date>,
    end: Option<Date>,
    tenor_months: Option<u32>,
    frequency: Option<Frequency>,
}

impl ObservationScheduleBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue (strike) date; not itself an observation.
    pub fn start(mut self, date: Date) -> Self {
        self.start = Some(date);
        self
    }

    /// Final observation date.
    pub fn end(mut self, date: Date) -> Self {
        self.end = Some(date);
        self
    }

    /// Final observation as a tenor from the start date; ignored if `end` is set.
    pub fn tenor_months(mut self, months: u32) -> Self {
        self.tenor_months = Some(months);
        self
    }

    /// Observation frequency.
    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Generate the schedule.
    ///
    /// # Errors
    ///
    /// * `MissingField` - start, frequency, or both end and tenor missing
    /// * `InvalidDateRange` - the end is not after the start
    /// * `Date` - month arithmetic overflowed
    pub fn build(self) -> Result<ObservationSchedule, ScheduleError> {
        let start = self.start.ok_or(ScheduleError::MissingField { field: "start" })?;
        let frequency = self
            .frequency
            .ok_or(ScheduleError::MissingField { field: "frequency" })?;
        let end = match (self.end, self.tenor_months) {
            (Some(end), _) => end,
            (None, Some(months)) => start.add_months(months)?,
            (None, None) => return Err(ScheduleError::MissingField { field: "end" }),
        };

        if end <= start {
            return Err(ScheduleError::InvalidDateRange {
                first: start,
                last: end,
            });
        }

        let mut dates = Vec::new();
        let mut k = 1;
        loop {
            let date = start.add_months(k * frequency.months())?;
            if date >= end {
                break;
            }
            dates.push(date);
            k += 1;
        }
        dates.push(end);

        Ok(ObservationSchedule { dates })
    }
}
