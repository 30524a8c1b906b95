//! Monte Carlo pricing of autocallable notes under Heston dynamics.
//!
//! # Architecture
//!
//! ```text
//! MonteCarloPricer
//! ├── MonteCarloConfig     (paths, seed, antithetic, grid, degeneracy policy)
//! ├── TimeGrid             (valuation + refined observation times)
//! ├── HestonPathSimulator  (Milstein step, correlated drivers)
//! ├── PathWorkspace        (per-chunk reusable buffers)
//! ├── PayoffEvaluator      (autocall / coupon / memory state machine)
//! └── PathStatistics       (Welford accumulation, ordered merge)
//! ```
//!
//! Paths are simulated in fixed-size chunks, each with its own random
//! stream derived from the master seed, and the chunk statistics are
//! merged in chunk order. Results are therefore reproducible bit for bit
//! for a given seed and configuration, independently of the thread pool.
//!
//! # Examples
//!
//! ```rust
//! use pricer_core::market_data::MarketEnvironment;
//! use pricer_core::types::Date;
//! use pricer_models::instruments::AutocallableNote;
//! use pricer_models::models::HestonParameters;
//! use pricer_pricing::mc::{MonteCarloConfig, MonteCarloPricer};
//!
//! let valuation = Date::from_ymd(2024, 7, 20).unwrap();
//! let env = MarketEnvironment::builder(valuation, 79.98)
//!     .risk_free_rate(0.02)
//!     .dividend_yield(0.028)
//!     .build()
//!     .unwrap();
//!
//! let dates = vec![
//!     Date::from_ymd(2025, 1, 20).unwrap(),
//!     Date::from_ymd(2025, 7, 20).unwrap(),
//! ];
//! let note = AutocallableNote::athena(dates, 1_000_000.0, 79.98, 0.04, 0.6)
//!     .memory(true)
//!     .build()
//!     .unwrap();
//! let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
//!
//! let config = MonteCarloConfig::builder()
//!     .n_paths(4_000)
//!     .antithetic(true)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! let result = MonteCarloPricer::new(config)
//!     .unwrap()
//!     .price(&params, &env, &note)
//!     .unwrap();
//! assert_eq!(result.num_samples, 2_000);
//! ```

pub mod config;
pub mod error;
pub mod paths;
pub mod payoff;
pub mod pricer;
pub mod workspace;

// Re-exports for convenient access
pub use config::{
    DegeneracyPolicy, MonteCarloConfig, MonteCarloConfigBuilder, MAX_PATHS, MAX_STEPS_PER_YEAR,
};
pub use error::{ConfigError, PricingError, SimulationError};
pub use paths::{HestonPathSimulator, PathSample, SimulationPath, TimeGrid};
pub use payoff::{NoteState, NoteStatus, PathOutcome, PayoffEvaluator};
pub use pricer::{
    AutocallProbability, MonteCarloPricer, PathStatistics, PricingResult,
    EARLY_TERMINATION_BATCH,
};
pub use workspace::PathWorkspace;
