//! Autocallable payoff evaluation along a simulated path.
//!
//! [`NoteState`] is the per-path state machine (alive, autocalled or
//! matured, plus the unpaid-coupon counter `U`). [`PayoffEvaluator`] runs
//! it over the settled prefix of the schedule once, then over each path's
//! live observations, discounting every cash flow from its observation
//! date to the valuation date.
//!
//! # Cash flows
//!
//! With notional `N`, coupon `c`, memory factor `m` and strike `K`:
//!
//! ```text
//! intermediate date, level >= autocall * K   N (1 + c (1 + m U))   -> autocalled
//! intermediate date, level >= coupon * K     N c (1 + m U), U = 0
//! intermediate date, otherwise               U += 1 with memory
//! final date,        level >= coupon * K     N (1 + c (1 + m U))   -> matured
//! final date,        level >= protection * K N                     -> matured
//! final date,        otherwise               N * payoff(level)     -> matured
//! ```
//!
//! Under [`MemoryResetPolicy::OnAutocall`] the autocall pays `N (1 + c)`.

use pricer_core::market_data::MarketEnvironment;
use pricer_core::types::Date;
use pricer_models::instruments::{AutocallableNote, InstrumentError, MemoryResetPolicy};

/// Lifecycle of one note along one path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteStatus {
    /// Still observing.
    #[default]
    Alive,
    /// Redeemed early on the observation date with this schedule index.
    Autocalled(usize),
    /// Redeemed at the final date.
    Matured,
}

/// State machine for one path: status plus the unpaid-coupon count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoteState {
    status: NoteStatus,
    unpaid: u32,
}

impl NoteState {
    /// Current status.
    #[inline]
    pub fn status(&self) -> NoteStatus {
        self.status
    }

    /// Missed coupons awaiting recovery.
    #[inline]
    pub fn unpaid_coupons(&self) -> u32 {
        self.unpaid
    }

    /// Whether the note has redeemed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status != NoteStatus::Alive
    }

    /// Applies observation `index` of the schedule at `level` and returns
    /// the undiscounted cash flow it pays, if any.
    ///
    /// Has no effect once the note is terminal.
    pub fn observe(&mut self, note: &AutocallableNote, index: usize, level: f64) -> Option<f64> {
        if self.is_terminal() {
            return None;
        }

        let notional = note.notional();
        let coupon = note.coupon_rate();
        let catch_up = 1.0 + note.memory_factor() * f64::from(self.unpaid);
        let is_final = index + 1 == note.observation_dates().len();

        if is_final {
            self.status = NoteStatus::Matured;
            let redemption = if level >= note.coupon_level() {
                notional * (1.0 + coupon * catch_up)
            } else if level >= note.protection_level() {
                notional
            } else {
                note.capital_loss_redemption(level)
            };
            return Some(redemption);
        }

        if level >= note.autocall_level() {
            self.status = NoteStatus::Autocalled(index);
            let paid = match note.memory_policy() {
                MemoryResetPolicy::OnPayment => notional * (1.0 + coupon * catch_up),
                MemoryResetPolicy::OnAutocall => notional * (1.0 + coupon),
            };
            self.unpaid = 0;
            Some(paid)
        } else if level >= note.coupon_level() {
            self.unpaid = 0;
            Some(notional * coupon * catch_up)
        } else {
            if note.has_memory() {
                self.unpaid += 1;
            }
            None
        }
    }
}

/// Result of evaluating one path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathOutcome {
    /// Sum of discounted cash flows paid after the valuation date.
    pub value: f64,
    /// Live-date index at which the path autocalled, if it did.
    pub autocall_index: Option<usize>,
}

/// Per-call payoff evaluator for an autocallable note.
///
/// Built once per pricing call: it validates fixings against the valuation
/// date, replays the settled observations from the fixings, and
/// precomputes the discount factor of every live observation date.
///
/// # Examples
///
/// ```rust
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::Date;
/// use pricer_models::instruments::AutocallableNote;
/// use pricer_pricing::mc::PayoffEvaluator;
///
/// let valuation = Date::from_ymd(2024, 1, 2).unwrap();
/// let env = MarketEnvironment::builder(valuation, 100.0).build().unwrap();
/// let note = AutocallableNote::phoenix(
///     vec![Date::from_ymd(2024, 7, 2).unwrap(), Date::from_ymd(2025, 1, 2).unwrap()],
///     100.0,
///     100.0,
///     0.05,
///     0.7,
///     0.6,
/// )
/// .build()
/// .unwrap();
///
/// let evaluator = PayoffEvaluator::new(&note, &env).unwrap();
/// let outcome = evaluator.evaluate([105.0, 90.0]);
/// assert!((outcome.value - 105.0).abs() < 1e-9);
/// assert_eq!(outcome.autocall_index, Some(0));
/// ```
#[derive(Debug)]
pub struct PayoffEvaluator<'a> {
    note: &'a AutocallableNote,
    settled_count: usize,
    settled_state: NoteState,
    live_dates: Vec<Date>,
    live_times: Vec<f64>,
    discount_factors: Vec<f64>,
}

impl<'a> PayoffEvaluator<'a> {
    /// Prepares evaluation of `note` against `env`.
    ///
    /// # Errors
    ///
    /// `InstrumentError::MissingFixing` / `UnexpectedFixing` if the fixings
    /// do not cover exactly the dates on or before the valuation date.
    pub fn new(note: &'a AutocallableNote, env: &MarketEnvironment) -> Result<Self, InstrumentError> {
        let valuation = env.valuation_date();
        note.validate_fixings(valuation)?;

        let settled_count = note.settled_count(valuation);
        let dates = note.observation_dates();

        let mut settled_state = NoteState::default();
        for (index, &date) in dates[..settled_count].iter().enumerate() {
            let level = note
                .past_fixing(date)
                .ok_or(InstrumentError::MissingFixing { date })?;
            // settled cash flows are already paid
            let _ = settled_state.observe(note, index, level);
        }

        let live_dates = dates[settled_count..].to_vec();
        let live_times = live_dates.iter().map(|&d| env.time_to(d)).collect();
        let discount_factors = live_dates.iter().map(|&d| env.discount_factor_to(d)).collect();

        Ok(Self {
            note,
            settled_count,
            settled_state,
            live_dates,
            live_times,
            discount_factors,
        })
    }

    /// The note being evaluated.
    #[inline]
    pub fn note(&self) -> &AutocallableNote {
        self.note
    }

    /// Whether no cash flow remains: called on a settled date, or the
    /// final date is on or before valuation.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        self.settled_state.is_terminal() || self.live_dates.is_empty()
    }

    /// State after replaying the settled fixings.
    #[inline]
    pub fn settled_state(&self) -> NoteState {
        self.settled_state
    }

    /// Observation dates after the valuation date.
    #[inline]
    pub fn live_dates(&self) -> &[Date] {
        &self.live_dates
    }

    /// Year fractions from valuation to each live date.
    #[inline]
    pub fn live_times(&self) -> &[f64] {
        &self.live_times
    }

    /// Discount factor of each live date.
    #[inline]
    pub fn discount_factors(&self) -> &[f64] {
        &self.discount_factors
    }

    /// Evaluates one path from its levels on the live dates, in order.
    pub fn evaluate<I>(&self, levels: I) -> PathOutcome
    where
        I: IntoIterator<Item = f64>,
    {
        let mut state = self.settled_state;
        let mut value = 0.0;

        for (k, (level, df)) in levels.into_iter().zip(&self.discount_factors).enumerate() {
            if let Some(cash) = state.observe(self.note, self.settled_count + k, level) {
                value += df * cash;
            }
            if state.is_terminal() {
                break;
            }
        }

        let autocall_index = match state.status() {
            NoteStatus::Autocalled(index) => Some(index - self.settled_count),
            _ => None,
        };
        PathOutcome {
            value,
            autocall_index,
        }
    }
}
