//! # pricer_pricing: Monte Carlo Engine (Layer 3)
//!
//! ## Layer 3 Role
//!
//! pricer_pricing is the top layer of the 3-layer workspace, providing:
//! - Random variate sources: `PricerRng`, `CorrelatedNormals` (`rng`)
//! - Heston path simulation over observation-anchored time grids (`mc::paths`)
//! - Autocallable payoff evaluation with memory and settled fixings (`mc::payoff`)
//! - Chunked, reproducible, parallel aggregation: `MonteCarloPricer` (`mc::pricer`)
//! - TOML engine settings for pricing, calibration and logging (`settings`)
//!
//! ## Layer Integration
//!
//! - Layer 1 (pricer_core): `MarketEnvironment`, `Date`, day counts
//! - Layer 2 (pricer_models): `HestonModel`, `AutocallableNote`, calibration
//!
//! ## Usage Example
//!
//! ```rust
//! use pricer_core::market_data::MarketEnvironment;
//! use pricer_core::types::{Date, DayCountConvention};
//! use pricer_models::instruments::AutocallableNote;
//! use pricer_models::models::HestonParameters;
//! use pricer_pricing::{MonteCarloConfig, MonteCarloPricer};
//!
//! let env = MarketEnvironment::builder(Date::from_ymd(2025, 1, 2).unwrap(), 100.0)
//!     .risk_free_rate(0.02)
//!     .day_count(DayCountConvention::Actual365Fixed)
//!     .build()
//!     .unwrap();
//! let note = AutocallableNote::phoenix(
//!     vec![Date::from_ymd(2026, 1, 2).unwrap()],
//!     1_000_000.0,
//!     100.0,
//!     0.05,
//!     0.7,
//!     0.6,
//! )
//! .build()
//! .unwrap();
//! let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
//!
//! let config = MonteCarloConfig::builder().n_paths(10_000).seed(42).build().unwrap();
//! let result = MonteCarloPricer::new(config).unwrap().price(&params, &env, &note).unwrap();
//!
//! assert!(result.present_value > 900_000.0 && result.present_value < 1_030_000.0);
//! ```
//!
//! ## Logging
//!
//! The engine emits `tracing` events and never installs a subscriber.
//! Hosts choose one, typically filtered by [`settings::LogLevel`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod mc;
pub mod rng;
pub mod settings;

// Re-export commonly used items for convenience
pub use mc::{MonteCarloConfig, MonteCarloPricer, PricingError, PricingResult};
pub use settings::EngineSettings;
