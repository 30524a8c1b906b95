//! Error types for the Monte Carlo engine.
//!
//! [`ConfigError`] covers configuration validation, [`SimulationError`]
//! a single degenerate trial, and [`PricingError`] everything a pricing
//! call can fail with.

use std::fmt;

use pricer_core::market_data::MarketDataError;
use pricer_models::instruments::InstrumentError;
use pricer_models::models::HestonError;
use thiserror::Error;

use super::config::{MAX_PATHS, MAX_STEPS_PER_YEAR};
use crate::rng::RngError;

/// Configuration error for Monte Carlo pricer.
///
/// These errors occur during construction when invalid parameters are provided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Path count outside valid range [1, MAX_PATHS].
    InvalidPathCount(usize),
    /// Steps per year outside valid range [1, MAX_STEPS_PER_YEAR].
    InvalidStepCount(usize),
    /// Invalid parameter value with name and description.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPathCount(count) => {
                write!(
                    f,
                    "Invalid path count {}: must be in range [1, {}]",
                    count, MAX_PATHS
                )
            }
            Self::InvalidStepCount(count) => {
                write!(
                    f,
                    "Invalid steps per year {}: must be in range [1, {}]",
                    count, MAX_STEPS_PER_YEAR
                )
            }
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid parameter '{}': {}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure of a single simulated trial.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SimulationError {
    /// The state left the finite range despite variance clamping.
    #[error("Non-finite state at step {step}: asset = {asset}, variance = {variance}")]
    NonFinite {
        /// Grid step that produced the state
        step: usize,
        /// Asset level after the step
        asset: f64,
        /// Variance after the step
        variance: f64,
    },

    /// The payoff of a finite path was not finite, e.g. from a custom
    /// final payoff rule.
    #[error("Non-finite payoff: {value}")]
    NonFinitePayoff {
        /// Discounted path value
        value: f64,
    },

    /// A grid step of non-positive length.
    #[error("Invalid time step {step}: dt = {dt} (must be positive)")]
    InvalidTimeStep {
        /// Index of the offending step
        step: usize,
        /// Its length in years
        dt: f64,
    },
}

/// Errors returned by [`MonteCarloPricer::price`](super::MonteCarloPricer::price).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Model parameters violate positivity, bounds or Feller.
    #[error("Invalid model parameters: {0}")]
    InvalidParameter(#[from] HestonError),

    /// The note specification is inconsistent with the valuation date.
    #[error("Invalid product specification: {0}")]
    InvalidProductSpec(#[from] InstrumentError),

    /// The market snapshot failed validation.
    #[error("Invalid market environment: {0}")]
    InvalidMarket(#[from] MarketDataError),

    /// Too many trials were discarded as degenerate.
    #[error("Numerical degeneracy: {discarded} of {attempted} simulated paths discarded")]
    NumericalDegeneracy {
        /// Paths discarded
        discarded: usize,
        /// Paths attempted, discarded ones included
        attempted: usize,
    },

    /// A degenerate trial under the abort policy, or a bad time grid.
    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Random variate source error.
    #[error("Random variate source: {0}")]
    Rng(#[from] RngError),
}
