//! Market data snapshots consumed by pricing and calibration.
//!
//! # Components
//!
//! - [`environment`]: Immutable [`MarketEnvironment`] (valuation date, spot,
//!   flat risk-free rate and dividend yield, day count)
//! - [`surface`]: Implied volatility quotes ([`VolSurfacePoint`], [`VolSurface`])
//! - [`error`]: Market data error types ([`MarketDataError`])
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::{MarketEnvironment, VolSurface, VolSurfacePoint};
//! use pricer_core::types::Date;
//!
//! let env = MarketEnvironment::builder(Date::from_ymd(2024, 7, 20).unwrap(), 100.0)
//!     .risk_free_rate(0.05)
//!     .build()
//!     .unwrap();
//! assert!((env.discount_factor(1.0) - 0.951229).abs() < 1e-5);
//!
//! let surface = VolSurface::new(vec![
//!     VolSurfacePoint::new(1.0, 90.0, 0.24),
//!     VolSurfacePoint::new(1.0, 100.0, 0.21),
//! ])
//! .unwrap();
//! assert_eq!(surface.len(), 2);
//! ```

pub mod environment;
pub mod error;
pub mod surface;

pub use environment::{MarketEnvironment, MarketEnvironmentBuilder};
pub use error::MarketDataError;
pub use surface::{VolSurface, VolSurfacePoint};
