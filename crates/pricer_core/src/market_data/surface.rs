//! Implied volatility quotes used as the calibration target.

use super::environment::MarketEnvironment;
use super::error::MarketDataError;
use crate::types::Date;

/// A single market quote: Black implied volatility at (expiry, strike).
///
/// `expiry` is a year fraction from the valuation date, measured with the
/// environment's day count.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolSurfacePoint {
    /// Time to expiry in years.
    pub expiry: f64,
    /// Absolute strike.
    pub strike: f64,
    /// Market implied volatility.
    pub implied_vol: f64,
}

impl VolSurfacePoint {
    /// Create a quote from a year-fraction expiry.
    pub fn new(expiry: f64, strike: f64, implied_vol: f64) -> Self {
        Self {
            expiry,
            strike,
            implied_vol,
        }
    }

    /// Create a quote from an expiry date, converting through the
    /// environment's day count.
    pub fn from_date(
        env: &MarketEnvironment,
        expiry: Date,
        strike: f64,
        implied_vol: f64,
    ) -> Result<Self, MarketDataError> {
        if expiry <= env.valuation_date() {
            return Err(MarketDataError::ExpiryBeforeValuation {
                expiry,
                valuation: env.valuation_date(),
            });
        }
        Ok(Self::new(env.time_to(expiry), strike, implied_vol))
    }

    fn validate(&self) -> Result<(), MarketDataError> {
        if !self.expiry.is_finite() || self.expiry <= 0.0 {
            return Err(MarketDataError::InvalidExpiry {
                expiry: self.expiry,
            });
        }
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(MarketDataError::InvalidStrike {
                strike: self.strike,
            });
        }
        if !self.implied_vol.is_finite() || self.implied_vol <= 0.0 {
            return Err(MarketDataError::InvalidVolatility {
                expiry: self.expiry,
                strike: self.strike,
                vol: self.implied_vol,
            });
        }
        Ok(())
    }
}

/// Ordered collection of implied volatility quotes.
///
/// Each (expiry, strike) pair may appear at most once. Insertion order is
/// preserved; it fixes the order of calibration residuals.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolSurface {
    points: Vec<VolSurfacePoint>,
}

impl VolSurface {
    /// Build a surface, validating every quote.
    pub fn new(points: Vec<VolSurfacePoint>) -> Result<Self, MarketDataError> {
        let surface = Self { points };
        surface.validate()?;
        Ok(surface)
    }

    /// Check every quote and reject repeated (expiry, strike) pairs.
    ///
    /// Surfaces built through [`new`](Self::new) already satisfy this;
    /// deserialised surfaces do not until checked.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        for (i, p) in self.points.iter().enumerate() {
            p.validate()?;
            if self.points[..i]
                .iter()
                .any(|q| q.expiry == p.expiry && q.strike == p.strike)
            {
                return Err(MarketDataError::DuplicatePoint {
                    expiry: p.expiry,
                    strike: p.strike,
                });
            }
        }
        Ok(())
    }

    /// Build a surface from an expiry-by-strike grid of vols, the layout
    /// market data vendors typically deliver.
    ///
    /// `vols[i][j]` is the quote for `expiries[i]` and `strikes[j]`.
    pub fn from_grid(
        expiries: &[f64],
        strikes: &[f64],
        vols: &[Vec<f64>],
    ) -> Result<Self, MarketDataError> {
        if vols.len() != expiries.len() {
            return Err(MarketDataError::InsufficientData {
                got: vols.len(),
                need: expiries.len(),
            });
        }
        let mut points = Vec::with_capacity(expiries.len() * strikes.len());
        for (&expiry, row) in expiries.iter().zip(vols) {
            if row.len() != strikes.len() {
                return Err(MarketDataError::InsufficientData {
                    got: row.len(),
                    need: strikes.len(),
                });
            }
            for (&strike, &vol) in strikes.iter().zip(row) {
                points.push(VolSurfacePoint::new(expiry, strike, vol));
            }
        }
        Self::new(points)
    }

    /// Quotes in insertion order.
    #[inline]
    pub fn points(&self) -> &[VolSurfacePoint] {
        &self.points
    }

    /// Number of quotes.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the surface has no quotes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the quotes.
    pub fn iter(&self) -> impl Iterator<Item = &VolSurfacePoint> {
        self.points.iter()
    }
}
