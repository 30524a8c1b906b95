//! Heston path generation.
//!
//! The simulator advances the joint `(S, v)` state over a [`TimeGrid`] with
//! the Milstein step of [`HestonModel`] and records the state at the
//! valuation date and at every observation date. Intermediate grid states
//! are never stored.
//!
//! # Drivers layout
//!
//! Correlated normals for one path are stored interleaved:
//! `drivers[2 * i]` drives the asset and `drivers[2 * i + 1]` the variance
//! over grid step `i`. An antithetic twin replays the same buffer with the
//! sign flipped.

use pricer_core::market_data::MarketEnvironment;
use pricer_models::models::HestonModel;

use super::error::SimulationError;
use crate::rng::{CorrelatedNormals, PricerRng, RngError};

/// Simulation time grid anchored at the valuation date (`t = 0`).
///
/// Each interval between consecutive observation times is split into
/// `max(1, ceil(dt * steps_per_year))` equal steps, so every observation
/// time lies exactly on the grid. Observation times that coincide with the
/// previous one (distinct dates with equal year fractions, e.g. under
/// 30/360) add no steps and share its grid index.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::TimeGrid;
///
/// let grid = TimeGrid::new(&[0.5, 1.0], 4).unwrap();
/// assert_eq!(grid.n_steps(), 4);
/// assert_eq!(grid.observation_indices(), &[2, 4]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
    observation_indices: Vec<usize>,
}

impl TimeGrid {
    /// Builds a grid through the given observation times (years from
    /// valuation, non-decreasing and non-negative).
    ///
    /// # Errors
    ///
    /// `SimulationError::InvalidTimeStep` if an interval has negative or
    /// non-finite length. `step` is the position of the offending
    /// observation time.
    pub fn new(observation_times: &[f64], steps_per_year: usize) -> Result<Self, SimulationError> {
        let mut times = vec![0.0];
        let mut observation_indices = Vec::with_capacity(observation_times.len());
        let mut previous = 0.0;

        for (step, &time) in observation_times.iter().enumerate() {
            let dt = time - previous;
            if !(dt.is_finite() && dt >= 0.0) {
                return Err(SimulationError::InvalidTimeStep { step, dt });
            }
            if dt == 0.0 {
                observation_indices.push(times.len() - 1);
                continue;
            }

            let n = ((dt * steps_per_year as f64).ceil() as usize).max(1);
            for j in 1..n {
                times.push(previous + dt * (j as f64 / n as f64));
            }
            times.push(time);
            observation_indices.push(times.len() - 1);
            previous = time;
        }

        Ok(Self {
            times,
            observation_indices,
        })
    }

    /// Grid times, starting with `0.0`.
    #[inline]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Number of simulation steps.
    #[inline]
    pub fn n_steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Grid index of each observation time.
    #[inline]
    pub fn observation_indices(&self) -> &[usize] {
        &self.observation_indices
    }

    /// Number of observation times.
    #[inline]
    pub fn n_observations(&self) -> usize {
        self.observation_indices.len()
    }

    /// Length of the drivers buffer one path consumes.
    #[inline]
    pub fn drivers_len(&self) -> usize {
        2 * self.n_steps()
    }
}

/// One recorded state of a simulated path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSample {
    /// Years from valuation.
    pub time: f64,
    /// Asset level.
    pub asset: f64,
    /// Instantaneous variance.
    pub variance: f64,
}

/// Recorded states of one trial: the valuation state followed by one sample
/// per observation date.
///
/// A path belongs to the trial that produced it and is overwritten by the
/// next trial through [`HestonPathSimulator::simulate_into`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationPath {
    samples: Vec<PathSample>,
}

impl SimulationPath {
    /// Empty path with room for `n_observations` observation samples.
    pub fn with_capacity(n_observations: usize) -> Self {
        Self {
            samples: Vec::with_capacity(n_observations + 1),
        }
    }

    /// All samples, valuation state first.
    #[inline]
    pub fn samples(&self) -> &[PathSample] {
        &self.samples
    }

    /// Samples on the observation dates.
    #[inline]
    pub fn observations(&self) -> &[PathSample] {
        self.samples.get(1..).unwrap_or(&[])
    }

    /// Asset levels on the observation dates.
    pub fn observed_levels(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.observations().iter().map(|s| s.asset)
    }

    /// Number of recorded samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }

    fn push(&mut self, time: f64, asset: f64, variance: f64) {
        self.samples.push(PathSample {
            time,
            asset,
            variance,
        });
    }
}

/// Heston path simulator for one pricing call.
///
/// Holds the model, the starting state and the risk-neutral drift
/// `r - q`. It has no mutable state and is shared by every worker.
///
/// # Examples
///
/// ```rust
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::Date;
/// use pricer_models::models::{HestonModel, HestonParameters};
/// use pricer_pricing::mc::{HestonPathSimulator, TimeGrid};
/// use pricer_pricing::rng::PricerRng;
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
///     .risk_free_rate(0.02)
///     .build()
///     .unwrap();
/// let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
/// let simulator = HestonPathSimulator::new(HestonModel::new(params).unwrap(), &env).unwrap();
///
/// let grid = TimeGrid::new(&[0.5, 1.0], 52).unwrap();
/// let path = simulator.simulate(&grid, &mut PricerRng::from_seed(7)).unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.samples()[0].asset, 100.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HestonPathSimulator {
    model: HestonModel,
    spot: f64,
    drift: f64,
    normals: CorrelatedNormals,
}

impl HestonPathSimulator {
    /// Creates a simulator starting from the environment's spot.
    ///
    /// # Errors
    ///
    /// `RngError::InvalidCorrelation` if the model correlation is unusable.
    pub fn new(model: HestonModel, env: &MarketEnvironment) -> Result<Self, RngError> {
        let normals = CorrelatedNormals::new(model.params().rho())?;
        Ok(Self {
            model,
            spot: env.spot(),
            drift: env.risk_free_rate() - env.dividend_yield(),
            normals,
        })
    }

    /// The simulated model.
    #[inline]
    pub fn model(&self) -> &HestonModel {
        &self.model
    }

    /// Correlated variate source for this model.
    #[inline]
    pub fn normals(&self) -> &CorrelatedNormals {
        &self.normals
    }

    /// Draws the correlated normals for one path over `grid`.
    #[inline]
    pub fn draw(&self, rng: &mut PricerRng, drivers: &mut [f64]) {
        self.normals.fill(rng, drivers);
    }

    /// Simulates one fresh path.
    pub fn simulate(
        &self,
        grid: &TimeGrid,
        rng: &mut PricerRng,
    ) -> Result<SimulationPath, SimulationError> {
        let mut drivers = vec![0.0; grid.drivers_len()];
        self.draw(rng, &mut drivers);

        let mut path = SimulationPath::with_capacity(grid.n_observations());
        self.simulate_into(grid, &drivers, 1.0, &mut path)?;
        Ok(path)
    }

    /// Simulates a path from pre-drawn drivers, overwriting `path`.
    ///
    /// `sign` multiplies every driver: `1.0` for a primary path, `-1.0` for
    /// its antithetic twin. `drivers` must hold `grid.drivers_len()` values.
    ///
    /// # Errors
    ///
    /// * `InvalidTimeStep` - a grid step is not positive
    /// * `NonFinite` - the state overflowed
    pub fn simulate_into(
        &self,
        grid: &TimeGrid,
        drivers: &[f64],
        sign: f64,
        path: &mut SimulationPath,
    ) -> Result<(), SimulationError> {
        debug_assert!(drivers.len() >= grid.drivers_len());

        let times = grid.times();
        let mut observations = grid.observation_indices().iter().peekable();

        let mut asset = self.spot;
        let mut variance = self.model.params().v0();
        path.clear();
        path.push(0.0, asset, variance);
        while observations.next_if_eq(&&0).is_some() {
            path.push(0.0, asset, variance);
        }

        for (i, (window, z)) in times.windows(2).zip(drivers.chunks_exact(2)).enumerate() {
            let step = i + 1;
            let dt = window[1] - window[0];
            if !(dt > 0.0) {
                return Err(SimulationError::InvalidTimeStep { step, dt });
            }

            (asset, variance) =
                self.model
                    .milstein_step(asset, variance, dt, sign * z[0], sign * z[1], self.drift);
            if !(asset.is_finite() && variance.is_finite()) {
                return Err(SimulationError::NonFinite {
                    step,
                    asset,
                    variance,
                });
            }

            while observations.next_if_eq(&&step).is_some() {
                path.push(window[1], asset, variance);
            }
        }

        Ok(())
    }
}
