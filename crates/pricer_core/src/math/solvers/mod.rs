//! Optimisation solvers for model calibration.
//!
//! - [`LevenbergMarquardtSolver`]: box-constrained nonlinear least squares
//! - [`ParameterBounds`]: per-parameter closed intervals
//!
//! The LM solver is configured through [`LMConfig`] and reports its stopping
//! reason as an [`LMTermination`]. Exhausting the iteration budget is a
//! flagged result (`converged == false`), never an error.

mod bounds;
mod levenberg_marquardt;

pub use bounds::ParameterBounds;
pub use levenberg_marquardt::{LMConfig, LMResult, LMTermination, LevenbergMarquardtSolver};
