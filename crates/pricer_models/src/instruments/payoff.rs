//! Redemption rules applied at maturity below the protection barrier.
//!
//! [`FinalPayoff`] is the extension point: implement it for a custom rule or
//! wrap a closure in [`PayoffFn`]. The default is [`CapitalAtRisk`], which
//! passes the full downside of the underlying through to the holder.

use std::fmt;

/// Redemption rule for a note that matures below its protection barrier.
///
/// `apply` returns the redemption as a fraction of notional; the cash flow
/// is `notional * apply(final_level)`.
pub trait FinalPayoff: Send + Sync {
    /// Redemption per unit notional for the final underlying level.
    fn apply(&self, final_level: f64) -> f64;

    /// Short label for logs and `Debug` output.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Full downside participation: redemption `level / K`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalAtRisk {
    strike: f64,
}

impl CapitalAtRisk {
    /// Create the rule for a strike level.
    pub fn new(strike: f64) -> Self {
        Self { strike }
    }
}

impl FinalPayoff for CapitalAtRisk {
    #[inline]
    fn apply(&self, final_level: f64) -> f64 {
        final_level / self.strike
    }

    fn name(&self) -> &str {
        "capital-at-risk"
    }
}

/// Fixed recovery regardless of the final level, e.g. a 50% floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedRedemption {
    ratio: f64,
}

impl FixedRedemption {
    /// Create the rule for a redemption ratio.
    pub fn new(ratio: f64) -> Self {
        Self { ratio }
    }
}

impl FinalPayoff for FixedRedemption {
    #[inline]
    fn apply(&self, _final_level: f64) -> f64 {
        self.ratio
    }

    fn name(&self) -> &str {
        "fixed-redemption"
    }
}

/// Adapter turning a closure into a [`FinalPayoff`].
///
/// ```
/// use pricer_models::instruments::{FinalPayoff, PayoffFn};
///
/// // Leveraged downside: lose twice the shortfall below 100
/// let geared = PayoffFn::new(|level: f64| (1.0 - 2.0 * (100.0 - level) / 100.0).max(0.0));
/// assert_eq!(geared.apply(80.0), 0.6);
/// ```
pub struct PayoffFn<F> {
    f: F,
}

impl<F> PayoffFn<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FinalPayoff for PayoffFn<F>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    #[inline]
    fn apply(&self, final_level: f64) -> f64 {
        (self.f)(final_level)
    }
}

impl<F> fmt::Debug for PayoffFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayoffFn")
    }
}
