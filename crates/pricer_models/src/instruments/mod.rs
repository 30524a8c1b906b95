//! Structured product definitions.
//!
//! - [`AutocallableNote`]: Autocallable note with conditional coupons,
//!   memory and capital protection (built via [`AutocallableNoteBuilder`])
//! - [`FinalPayoff`]: Redemption rule below the protection barrier, with
//!   [`CapitalAtRisk`] (default), [`FixedRedemption`] and the [`PayoffFn`]
//!   closure adapter
//! - [`InstrumentError`]: Product specification errors
//!
//! # Examples
//!
//! ```
//! use pricer_models::instruments::{AutocallableNote, MemoryResetPolicy};
//! use pricer_core::types::Date;
//!
//! let dates = vec![Date::from_ymd(2025, 7, 20).unwrap()];
//! let note = AutocallableNote::builder(dates, 1_000_000.0, 100.0)
//!     .autocall_barrier(1.0)
//!     .coupon_barrier(0.7)
//!     .protection_barrier(0.6)
//!     .coupon_rate(0.05)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(note.memory_policy(), MemoryResetPolicy::OnPayment);
//! ```

mod autocallable;
mod error;
mod payoff;

pub use autocallable::{AutocallableNote, AutocallableNoteBuilder, MemoryResetPolicy};
pub use error::InstrumentError;
pub use payoff::{CapitalAtRisk, FinalPayoff, FixedRedemption, PayoffFn};
