//! # pricer_core: Foundation Layer for Heston Autocallable Pricing
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the 3-layer workspace, providing:
//! - Time types: `Date`, `DayCountConvention` (`types::time`)
//! - Error types: `DateError`, `SolverError` (`types::error`)
//! - Market snapshots: `MarketEnvironment`, `VolSurface` (`market_data`)
//! - Bounded nonlinear least squares: `LevenbergMarquardtSolver` (`math::solvers`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other pricer_* crates, with minimal external dependencies:
//! - chrono: Date arithmetic
//! - thiserror: Error derivation
//! - tracing: Solver progress events
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::market_data::MarketEnvironment;
//! use pricer_core::types::{Date, DayCountConvention};
//!
//! let valuation = Date::from_ymd(2024, 7, 20).unwrap();
//! let env = MarketEnvironment::builder(valuation, 79.98)
//!     .risk_free_rate(0.02)
//!     .dividend_yield(0.028)
//!     .day_count(DayCountConvention::Actual360)
//!     .build()
//!     .unwrap();
//!
//! let payment = Date::from_ymd(2025, 1, 20).unwrap();
//! let df = env.discount_factor_to(payment);
//! assert!(df < 1.0 && df > 0.98);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for Date, DayCountConvention and market snapshots

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
