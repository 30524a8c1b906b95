//! Numerical routines.
//!
//! - [`solvers`]: Bounded Levenberg-Marquardt least squares for calibration

pub mod solvers;
