//! # Pricer Models (L2: Business Logic)
//!
//! Heston model, autocallable note definitions, observation schedules and
//! calibration.
//!
//! This crate provides:
//! - The Heston parameter set and its Milstein discretisation step
//! - Autocallable note specifications with pluggable final payoffs
//! - Observation schedule generation
//! - Heston calibration to implied volatility surfaces
//!
//! ## Design Principles
//!
//! - **Validated construction**: parameter sets and notes are checked once
//!   when built and are immutable afterwards
//! - **Builder pattern** for ergonomic API with sensible defaults
//! - **Trait seams** for the parts callers supply: [`instruments::FinalPayoff`]
//!   and [`calibration::ImpliedVolOracle`]
//!
//! ## Feature Flags
//!
//! - `serde` (default): Serialisation for parameters, notes' enums and configs
//! - `parallel` (default): Price calibration surface points with rayon

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod calibration;
pub mod instruments;
pub mod models;
pub mod schedules;
