//! Reusable per-worker buffers for path simulation.
//!
//! A [`PathWorkspace`] is allocated once per work chunk and reused for every
//! trial in it, so the simulation loop performs no heap allocation after
//! the first trial.

use super::error::SimulationError;
use super::paths::{HestonPathSimulator, SimulationPath, TimeGrid};
use crate::rng::PricerRng;

/// Driver buffer plus the primary and antithetic path of the current trial.
///
/// # Examples
///
/// ```rust
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::Date;
/// use pricer_models::models::{HestonModel, HestonParameters};
/// use pricer_pricing::mc::{HestonPathSimulator, PathWorkspace, TimeGrid};
/// use pricer_pricing::rng::PricerRng;
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
///     .build()
///     .unwrap();
/// let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
/// let simulator = HestonPathSimulator::new(HestonModel::new(params).unwrap(), &env).unwrap();
/// let grid = TimeGrid::new(&[1.0], 52).unwrap();
///
/// let mut workspace = PathWorkspace::new(&grid);
/// workspace.run_trial(&simulator, &grid, &mut PricerRng::from_seed(1), true).unwrap();
/// assert_eq!(workspace.primary().len(), 2);
/// assert_eq!(workspace.twin().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct PathWorkspace {
    /// Interleaved correlated normals (2 × n_steps).
    drivers: Vec<f64>,
    primary: SimulationPath,
    twin: SimulationPath,
}

impl PathWorkspace {
    /// Allocates buffers sized for `grid`.
    pub fn new(grid: &TimeGrid) -> Self {
        Self {
            drivers: vec![0.0; grid.drivers_len()],
            primary: SimulationPath::with_capacity(grid.n_observations()),
            twin: SimulationPath::with_capacity(grid.n_observations()),
        }
    }

    /// Draws fresh drivers and simulates the primary path, and its
    /// antithetic twin when `antithetic` is set.
    ///
    /// On error the workspace content is unspecified; the next call
    /// overwrites it.
    pub fn run_trial(
        &mut self,
        simulator: &HestonPathSimulator,
        grid: &TimeGrid,
        rng: &mut PricerRng,
        antithetic: bool,
    ) -> Result<(), SimulationError> {
        if self.drivers.len() != grid.drivers_len() {
            self.drivers.resize(grid.drivers_len(), 0.0);
        }

        simulator.draw(rng, &mut self.drivers);
        simulator.simulate_into(grid, &self.drivers, 1.0, &mut self.primary)?;
        if antithetic {
            simulator.simulate_into(grid, &self.drivers, -1.0, &mut self.twin)?;
        }
        Ok(())
    }

    /// Path driven by the drawn normals.
    #[inline]
    pub fn primary(&self) -> &SimulationPath {
        &self.primary
    }

    /// Path driven by the negated normals (valid after an antithetic trial).
    #[inline]
    pub fn twin(&self) -> &SimulationPath {
        &self.twin
    }

    /// The drivers of the last trial.
    #[inline]
    pub fn drivers(&self) -> &[f64] {
        &self.drivers
    }
}
