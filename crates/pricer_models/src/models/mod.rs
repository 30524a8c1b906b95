//! Stochastic models for Monte Carlo simulation.
//!
//! - [`heston`]: Heston stochastic volatility (`HestonParameters`,
//!   `HestonModel` with the Milstein step)
//!
//! Models hold immutable parameters; a model value is built per pricing
//! call and passed explicitly to the simulator, never stored globally.

pub mod heston;

pub use heston::{
    HestonError, HestonModel, HestonParamIndex, HestonParameters, DEFAULT_VARIANCE_CEILING,
};
