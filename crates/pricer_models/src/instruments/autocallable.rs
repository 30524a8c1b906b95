//! Autocallable structured notes.
//!
//! An autocallable note observes the underlying on a schedule of dates.
//! On each intermediate date the note either redeems early (autocall),
//! pays a conditional coupon, or records a missed coupon for later
//! recovery (memory). At the final date it redeems at par plus coupon,
//! at par, or with capital loss through a [`FinalPayoff`] rule.
//!
//! All barriers are fractions of the strike `K`.
//!
//! # Example
//!
//! ```
//! use pricer_models::instruments::AutocallableNote;
//! use pricer_core::types::Date;
//!
//! let dates = vec![
//!     Date::from_ymd(2025, 1, 20).unwrap(),
//!     Date::from_ymd(2025, 7, 20).unwrap(),
//! ];
//!
//! let note = AutocallableNote::phoenix(dates, 1_000_000.0, 100.0, 0.05, 0.7, 0.6)
//!     .memory(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(note.autocall_level(), 100.0);
//! assert_eq!(note.coupon_level(), 70.0);
//! assert_eq!(note.protection_level(), 60.0);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use pricer_core::types::Date;
use tracing::warn;

use super::error::InstrumentError;
use super::payoff::{CapitalAtRisk, FinalPayoff};

/// When the unpaid-coupon counter is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MemoryResetPolicy {
    /// Cleared only by a paid coupon; autocall and maturity redemptions
    /// include the accrued catch-up.
    #[default]
    OnPayment,
    /// Also forfeited when the note is called: the autocall pays a single
    /// coupon with no catch-up.
    OnAutocall,
}

/// Immutable autocallable note specification.
///
/// Built through [`AutocallableNoteBuilder`], which validates the schedule,
/// barriers and fixings. Coverage of past fixings depends on the valuation
/// date and is checked separately by [`validate_fixings`](Self::validate_fixings).
#[derive(Clone)]
pub struct AutocallableNote {
    observation_dates: Vec<Date>,
    notional: f64,
    strike: f64,
    autocall_barrier: f64,
    coupon_barrier: f64,
    protection_barrier: f64,
    coupon_rate: f64,
    has_memory: bool,
    memory_policy: MemoryResetPolicy,
    past_fixings: BTreeMap<Date, f64>,
    final_payoff: Arc<dyn FinalPayoff>,
}

impl AutocallableNote {
    /// Start a builder with default barriers (all at 100% of strike), zero
    /// coupon, no memory and capital-at-risk redemption.
    pub fn builder(observation_dates: Vec<Date>, notional: f64, strike: f64) -> AutocallableNoteBuilder {
        AutocallableNoteBuilder::new(observation_dates, notional, strike)
    }

    /// Athena-style note: autocall and coupon barrier both at 100% of strike.
    pub fn athena(
        observation_dates: Vec<Date>,
        notional: f64,
        strike: f64,
        coupon_rate: f64,
        protection_barrier: f64,
    ) -> AutocallableNoteBuilder {
        Self::builder(observation_dates, notional, strike)
            .autocall_barrier(1.0)
            .coupon_barrier(1.0)
            .protection_barrier(protection_barrier)
            .coupon_rate(coupon_rate)
    }

    /// Phoenix-style note: autocall at 100% of strike with a lower coupon barrier.
    pub fn phoenix(
        observation_dates: Vec<Date>,
        notional: f64,
        strike: f64,
        coupon_rate: f64,
        coupon_barrier: f64,
        protection_barrier: f64,
    ) -> AutocallableNoteBuilder {
        Self::builder(observation_dates, notional, strike)
            .autocall_barrier(1.0)
            .coupon_barrier(coupon_barrier)
            .protection_barrier(protection_barrier)
            .coupon_rate(coupon_rate)
    }

    /// Observation dates, strictly increasing.
    #[inline]
    pub fn observation_dates(&self) -> &[Date] {
        &self.observation_dates
    }

    /// Final observation (maturity) date.
    #[inline]
    pub fn final_date(&self) -> Date {
        // non-empty by construction
        self.observation_dates[self.observation_dates.len() - 1]
    }

    /// Notional `N`.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// Strike `K`.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Conditional coupon rate `c` per observation.
    #[inline]
    pub fn coupon_rate(&self) -> f64 {
        self.coupon_rate
    }

    /// Whether missed coupons are recovered later.
    #[inline]
    pub fn has_memory(&self) -> bool {
        self.has_memory
    }

    /// Memory multiplier `m`: 1 with memory, 0 without.
    #[inline]
    pub fn memory_factor(&self) -> f64 {
        if self.has_memory {
            1.0
        } else {
            0.0
        }
    }

    /// Memory reset policy.
    #[inline]
    pub fn memory_policy(&self) -> MemoryResetPolicy {
        self.memory_policy
    }

    /// Autocall barrier as a fraction of strike.
    #[inline]
    pub fn autocall_barrier(&self) -> f64 {
        self.autocall_barrier
    }

    /// Coupon barrier as a fraction of strike.
    #[inline]
    pub fn coupon_barrier(&self) -> f64 {
        self.coupon_barrier
    }

    /// Protection barrier as a fraction of strike.
    #[inline]
    pub fn protection_barrier(&self) -> f64 {
        self.protection_barrier
    }

    /// Absolute autocall level `autocall_barrier * K`.
    #[inline]
    pub fn autocall_level(&self) -> f64 {
        self.autocall_barrier * self.strike
    }

    /// Absolute coupon level `coupon_barrier * K`.
    #[inline]
    pub fn coupon_level(&self) -> f64 {
        self.coupon_barrier * self.strike
    }

    /// Absolute protection level `protection_barrier * K`.
    #[inline]
    pub fn protection_level(&self) -> f64 {
        self.protection_barrier * self.strike
    }

    /// Observed level for a settled date, if supplied.
    #[inline]
    pub fn past_fixing(&self, date: Date) -> Option<f64> {
        self.past_fixings.get(&date).copied()
    }

    /// All supplied fixings.
    pub fn past_fixings(&self) -> &BTreeMap<Date, f64> {
        &self.past_fixings
    }

    /// Redemption rule below the protection barrier.
    pub fn final_payoff(&self) -> &dyn FinalPayoff {
        self.final_payoff.as_ref()
    }

    /// Cash redemption below protection: `N * final_payoff(level)`.
    #[inline]
    pub fn capital_loss_redemption(&self, final_level: f64) -> f64 {
        self.notional * self.final_payoff.apply(final_level)
    }

    /// Number of observation dates on or before `valuation_date`.
    pub fn settled_count(&self, valuation_date: Date) -> usize {
        self.observation_dates
            .partition_point(|d| *d <= valuation_date)
    }

    /// Check that fixings cover exactly the observation dates on or before
    /// `valuation_date`.
    ///
    /// # Errors
    ///
    /// * `MissingFixing` - a settled observation date has no fixing
    /// * `UnexpectedFixing` - a fixing is dated after valuation or off-schedule
    pub fn validate_fixings(&self, valuation_date: Date) -> Result<(), InstrumentError> {
        let settled = &self.observation_dates[..self.settled_count(valuation_date)];

        if let Some(&date) = settled.iter().find(|d| !self.past_fixings.contains_key(*d)) {
            return Err(InstrumentError::MissingFixing { date });
        }
        if let Some(&date) = self
            .past_fixings
            .keys()
            .find(|d| settled.binary_search(*d).is_err())
        {
            return Err(InstrumentError::UnexpectedFixing { date });
        }
        Ok(())
    }
}

impl fmt::Debug for AutocallableNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutocallableNote")
            .field("observation_dates", &self.observation_dates)
            .field("notional", &self.notional)
            .field("strike", &self.strike)
            .field("autocall_barrier", &self.autocall_barrier)
            .field("coupon_barrier", &self.coupon_barrier)
            .field("protection_barrier", &self.protection_barrier)
            .field("coupon_rate", &self.coupon_rate)
            .field("has_memory", &self.has_memory)
            .field("memory_policy", &self.memory_policy)
            .field("past_fixings", &self.past_fixings)
            .field("final_payoff", &self.final_payoff.name())
            .finish()
    }
}

/// Builder for [`AutocallableNote`].
pub struct AutocallableNoteBuilder {
    observation_dates: Vec<Date>,
    notional: f64,
    strike: f64,
    autocall_barrier: f64,
    coupon_barrier: f64,
    protection_barrier: f64,
    coupon_rate: f64,
    has_memory: bool,
    memory_policy: MemoryResetPolicy,
    past_fixings: BTreeMap<Date, f64>,
    final_payoff: Option<Arc<dyn FinalPayoff>>,
    allow_inverted_barriers: bool,
}

impl AutocallableNoteBuilder {
    fn new(observation_dates: Vec<Date>, notional: f64, strike: f64) -> Self {
        Self {
            observation_dates,
            notional,
            strike,
            autocall_barrier: 1.0,
            coupon_barrier: 1.0,
            protection_barrier: 1.0,
            coupon_rate: 0.0,
            has_memory: false,
            memory_policy: MemoryResetPolicy::default(),
            past_fixings: BTreeMap::new(),
            final_payoff: None,
            allow_inverted_barriers: false,
        }
    }

    /// Autocall barrier (fraction of strike). `f64::INFINITY` disables early redemption.
    pub fn autocall_barrier(mut self, barrier: f64) -> Self {
        self.autocall_barrier = barrier;
        self
    }

    /// Coupon barrier (fraction of strike).
    pub fn coupon_barrier(mut self, barrier: f64) -> Self {
        self.coupon_barrier = barrier;
        self
    }

    /// Protection barrier (fraction of strike).
    pub fn protection_barrier(mut self, barrier: f64) -> Self {
        self.protection_barrier = barrier;
        self
    }

    /// Coupon rate per observation.
    pub fn coupon_rate(mut self, rate: f64) -> Self {
        self.coupon_rate = rate;
        self
    }

    /// Enable or disable the memory feature.
    pub fn memory(mut self, has_memory: bool) -> Self {
        self.has_memory = has_memory;
        self
    }

    /// Set the memory reset policy.
    pub fn memory_policy(mut self, policy: MemoryResetPolicy) -> Self {
        self.memory_policy = policy;
        self
    }

    /// Record the observed level for a settled date.
    pub fn past_fixing(mut self, date: Date, level: f64) -> Self {
        self.past_fixings.insert(date, level);
        self
    }

    /// Replace all past fixings.
    pub fn past_fixings(mut self, fixings: BTreeMap<Date, f64>) -> Self {
        self.past_fixings = fixings;
        self
    }

    /// Replace the below-protection redemption rule.
    pub fn final_payoff<P>(mut self, payoff: P) -> Self
    where
        P: FinalPayoff + 'static,
    {
        self.final_payoff = Some(Arc::new(payoff));
        self
    }

    /// Accept an autocall barrier below the coupon barrier.
    pub fn allow_inverted_barriers(mut self, allow: bool) -> Self {
        self.allow_inverted_barriers = allow;
        self
    }

    /// Validate and build the note.
    pub fn build(self) -> Result<AutocallableNote, InstrumentError> {
        if self.observation_dates.is_empty() {
            return Err(InstrumentError::EmptySchedule);
        }
        if let Some(w) = self.observation_dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(InstrumentError::NonIncreasingDates {
                previous: w[0],
                next: w[1],
            });
        }

        if !(self.notional > 0.0 && self.notional.is_finite()) {
            return Err(InstrumentError::InvalidNotional {
                notional: self.notional,
            });
        }
        if !(self.strike > 0.0 && self.strike.is_finite()) {
            return Err(InstrumentError::InvalidStrike {
                strike: self.strike,
            });
        }

        // autocall may be +inf (never called); the others must be finite
        if self.autocall_barrier.is_nan() || self.autocall_barrier <= 0.0 {
            return Err(InstrumentError::InvalidBarrier {
                name: "autocall",
                value: self.autocall_barrier,
            });
        }
        for (name, value) in [
            ("coupon", self.coupon_barrier),
            ("protection", self.protection_barrier),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(InstrumentError::InvalidBarrier { name, value });
            }
        }
        if !self.coupon_rate.is_finite() {
            return Err(InstrumentError::InvalidCouponRate {
                rate: self.coupon_rate,
            });
        }

        if self.autocall_barrier < self.coupon_barrier {
            if !self.allow_inverted_barriers {
                return Err(InstrumentError::InvertedBarriers {
                    autocall: self.autocall_barrier,
                    coupon: self.coupon_barrier,
                });
            }
            warn!(
                autocall = self.autocall_barrier,
                coupon = self.coupon_barrier,
                "autocall barrier below coupon barrier accepted by override"
            );
        }

        if let Some((&date, &level)) = self
            .past_fixings
            .iter()
            .find(|(_, level)| !(**level > 0.0 && level.is_finite()))
        {
            return Err(InstrumentError::InvalidFixing { date, level });
        }

        let final_payoff = self
            .final_payoff
            .unwrap_or_else(|| Arc::new(CapitalAtRisk::new(self.strike)));

        Ok(AutocallableNote {
            observation_dates: self.observation_dates,
            notional: self.notional,
            strike: self.strike,
            autocall_barrier: self.autocall_barrier,
            coupon_barrier: self.coupon_barrier,
            protection_barrier: self.protection_barrier,
            coupon_rate: self.coupon_rate,
            has_memory: self.has_memory,
            memory_policy: self.memory_policy,
            past_fixings: self.past_fixings,
            final_payoff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::FixedRedemption;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn schedule() -> Vec<Date> {
        vec![d(2024, 1, 20), d(2024, 7, 20), d(2025, 1, 20), d(2025, 7, 20)]
    }

    #[test]
    fn test_athena_preset() {
        let note = AutocallableNote::athena(schedule(), 1_000_000.0, 79.98, 0.05, 0.6)
            .build()
            .unwrap();
        assert_eq!(note.autocall_barrier(), 1.0);
        assert_eq!(note.coupon_barrier(), 1.0);
        assert_relative_eq!(note.protection_level(), 0.6 * 79.98);
        assert!(!note.has_memory());
        assert_eq!(note.memory_factor(), 0.0);
        assert_eq!(note.final_date(), d(2025, 7, 20));
    }

    #[test]
    fn test_default_final_payoff_is_level_over_strike() {
        let note = AutocallableNote::builder(schedule(), 1_000.0, 80.0).build().unwrap();
        assert_relative_eq!(note.capital_loss_redemption(40.0), 500.0);
        assert_eq!(note.final_payoff().name(), "capital-at-risk");
    }

    #[test]
    fn test_custom_final_payoff() {
        let note = AutocallableNote::builder(schedule(), 1_000.0, 80.0)
            .final_payoff(FixedRedemption::new(0.25))
            .build()
            .unwrap();
        assert_relative_eq!(note.capital_loss_redemption(10.0), 250.0);
    }

    #[test]
    fn test_rejects_empty_and_unordered_schedule() {
        assert!(matches!(
            AutocallableNote::builder(vec![], 1.0, 1.0).build(),
            Err(InstrumentError::EmptySchedule)
        ));
        let unordered = vec![d(2024, 7, 20), d(2024, 7, 20)];
        assert!(matches!(
            AutocallableNote::builder(unordered, 1.0, 1.0).build(),
            Err(InstrumentError::NonIncreasingDates { .. })
        ));
    }

    #[test]
    fn test_inverted_barriers_flagged() {
        let result = AutocallableNote::builder(schedule(), 1.0, 1.0)
            .autocall_barrier(0.8)
            .coupon_barrier(0.9)
            .build();
        assert!(matches!(result, Err(InstrumentError::InvertedBarriers { .. })));

        let accepted = AutocallableNote::builder(schedule(), 1.0, 1.0)
            .autocall_barrier(0.8)
            .coupon_barrier(0.9)
            .allow_inverted_barriers(true)
            .build();
        assert!(accepted.is_ok());
    }

    #[test]
    fn test_unreachable_autocall_allowed() {
        let note = AutocallableNote::builder(schedule(), 1.0, 100.0)
            .autocall_barrier(f64::INFINITY)
            .coupon_barrier(0.7)
            .build()
            .unwrap();
        assert!(note.autocall_level().is_infinite());
    }

    #[test]
    fn test_rejects_nan_barrier_and_bad_fixing() {
        assert!(matches!(
            AutocallableNote::builder(schedule(), 1.0, 1.0)
                .protection_barrier(f64::NAN)
                .build(),
            Err(InstrumentError::InvalidBarrier { name: "protection", .. })
        ));
        assert!(matches!(
            AutocallableNote::builder(schedule(), 1.0, 1.0)
                .past_fixing(d(2024, 1, 20), -5.0)
                .build(),
            Err(InstrumentError::InvalidFixing { .. })
        ));
    }

    #[test]
    fn test_fixing_coverage() {
        let valuation = d(2024, 9, 1);
        let note = AutocallableNote::builder(schedule(), 1.0, 100.0)
            .past_fixing(d(2024, 1, 20), 95.0)
            .build()
            .unwrap();
        assert_eq!(note.settled_count(valuation), 2);
        assert_eq!(
            note.validate_fixings(valuation),
            Err(InstrumentError::MissingFixing { date: d(2024, 7, 20) })
        );

        let complete = AutocallableNote::builder(schedule(), 1.0, 100.0)
            .past_fixing(d(2024, 1, 20), 95.0)
            .past_fixing(d(2024, 7, 20), 90.0)
            .build()
            .unwrap();
        assert!(complete.validate_fixings(valuation).is_ok());

        let extra = AutocallableNote::builder(schedule(), 1.0, 100.0)
            .past_fixing(d(2024, 1, 20), 95.0)
            .past_fixing(d(2024, 7, 20), 90.0)
            .past_fixing(d(2025, 1, 20), 90.0)
            .build()
            .unwrap();
        assert_eq!(
            extra.validate_fixings(valuation),
            Err(InstrumentError::UnexpectedFixing { date: d(2025, 1, 20) })
        );
    }

    #[test]
    fn test_valuation_on_observation_date_counts_as_settled() {
        let note = AutocallableNote::builder(schedule(), 1.0, 100.0).build().unwrap();
        assert_eq!(note.settled_count(d(2024, 1, 20)), 1);
        assert_eq!(note.settled_count(d(2023, 1, 1)), 0);
    }
}
