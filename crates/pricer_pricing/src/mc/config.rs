//! Monte Carlo simulation configuration.
//!
//! This module provides configuration types and builders for Heston Monte
//! Carlo pricing of autocallable notes.

use pricer_models::models::DEFAULT_VARIANCE_CEILING;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Maximum number of simulation paths allowed.
pub const MAX_PATHS: usize = 10_000_000;

/// Maximum time-grid refinement, in steps per year.
pub const MAX_STEPS_PER_YEAR: usize = 10_000;

/// What to do with a trial whose state becomes non-finite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneracyPolicy {
    /// Discard the trial (or antithetic pair) and draw a replacement from
    /// the same stream, up to `max_discard_fraction` of the requested paths.
    #[default]
    Resample,
    /// Fail the pricing call on the first degenerate trial.
    Abort,
}

/// Monte Carlo simulation configuration.
///
/// Immutable configuration specifying simulation parameters.
/// Use [`MonteCarloConfigBuilder`] to construct instances.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::MonteCarloConfig;
///
/// let config = MonteCarloConfig::builder()
///     .n_paths(10_000)
///     .steps_per_year(52)
///     .antithetic(true)
///     .seed(42)
///     .build()
///     .expect("valid configuration");
///
/// assert_eq!(config.n_paths(), 10_000);
/// assert_eq!(config.n_samples(), 5_000);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct MonteCarloConfig {
    n_paths: usize,
    seed: u64,
    antithetic: bool,
    steps_per_year: usize,
    chunk_size: usize,
    degeneracy_policy: DegeneracyPolicy,
    max_discard_fraction: f64,
    target_std_error: Option<f64>,
    track_autocall_probabilities: bool,
    variance_ceiling: f64,
    allow_feller_violation: bool,
}

impl MonteCarloConfig {
    /// Creates a new configuration builder.
    #[inline]
    pub fn builder() -> MonteCarloConfigBuilder {
        MonteCarloConfigBuilder::default()
    }

    /// Number of simulated paths requested.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of independent samples: pairs when antithetic, paths otherwise.
    #[inline]
    pub fn n_samples(&self) -> usize {
        if self.antithetic {
            self.n_paths / 2
        } else {
            self.n_paths
        }
    }

    /// Master seed.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Whether paths are simulated in antithetic pairs.
    #[inline]
    pub fn antithetic(&self) -> bool {
        self.antithetic
    }

    /// Minimum time-grid steps per year between observation dates.
    #[inline]
    pub fn steps_per_year(&self) -> usize {
        self.steps_per_year
    }

    /// Paths per independently seeded work chunk.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples per work chunk.
    #[inline]
    pub fn samples_per_chunk(&self) -> usize {
        if self.antithetic {
            self.chunk_size / 2
        } else {
            self.chunk_size
        }
    }

    /// Treatment of degenerate trials.
    #[inline]
    pub fn degeneracy_policy(&self) -> DegeneracyPolicy {
        self.degeneracy_policy
    }

    /// Largest share of `n_paths` that may be discarded under `Resample`.
    #[inline]
    pub fn max_discard_fraction(&self) -> f64 {
        self.max_discard_fraction
    }

    /// Discarded paths tolerated before the call fails.
    #[inline]
    pub fn max_discarded_paths(&self) -> usize {
        (self.max_discard_fraction * self.n_paths as f64).floor() as usize
    }

    /// Standard error at which pricing may stop early.
    #[inline]
    pub fn target_std_error(&self) -> Option<f64> {
        self.target_std_error
    }

    /// Whether per-date autocall probabilities are collected.
    #[inline]
    pub fn track_autocall_probabilities(&self) -> bool {
        self.track_autocall_probabilities
    }

    /// Cap on the simulated variance.
    #[inline]
    pub fn variance_ceiling(&self) -> f64 {
        self.variance_ceiling
    }

    /// Whether Feller-violating parameters are simulated instead of rejected.
    #[inline]
    pub fn allow_feller_violation(&self) -> bool {
        self.allow_feller_violation
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `n_paths` is 0, greater than [`MAX_PATHS`], odd with antithetic
    ///   sampling, or gives fewer than two independent samples
    /// - `steps_per_year` is 0 or greater than [`MAX_STEPS_PER_YEAR`]
    /// - `chunk_size` holds no complete sample
    /// - a fraction, target or ceiling is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_paths == 0 || self.n_paths > MAX_PATHS {
            return Err(ConfigError::InvalidPathCount(self.n_paths));
        }
        if self.antithetic && self.n_paths % 2 != 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_paths",
                value: format!("{} must be even with antithetic sampling", self.n_paths),
            });
        }
        if self.n_samples() < 2 {
            return Err(ConfigError::InvalidParameter {
                name: "n_paths",
                value: "at least two independent samples are needed for a standard error"
                    .to_string(),
            });
        }
        if self.steps_per_year == 0 || self.steps_per_year > MAX_STEPS_PER_YEAR {
            return Err(ConfigError::InvalidStepCount(self.steps_per_year));
        }
        if self.samples_per_chunk() == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "chunk_size",
                value: format!("{} holds no complete sample", self.chunk_size),
            });
        }
        if !(0.0..=1.0).contains(&self.max_discard_fraction) {
            return Err(ConfigError::InvalidParameter {
                name: "max_discard_fraction",
                value: format!("{} must lie in [0, 1]", self.max_discard_fraction),
            });
        }
        if let Some(target) = self.target_std_error {
            if !(target.is_finite() && target > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "target_std_error",
                    value: format!("{} must be positive", target),
                });
            }
        }
        if !(self.variance_ceiling.is_finite() && self.variance_ceiling > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "variance_ceiling",
                value: format!("{} must be positive and finite", self.variance_ceiling),
            });
        }
        Ok(())
    }
}

/// Builder for [`MonteCarloConfig`].
///
/// Provides a fluent API for constructing Monte Carlo configurations
/// with validation at build time. Only `n_paths` is required.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::{DegeneracyPolicy, MonteCarloConfig};
///
/// let config = MonteCarloConfig::builder()
///     .n_paths(100_000)
///     .steps_per_year(252)
///     .degeneracy_policy(DegeneracyPolicy::Abort)
///     .target_std_error(500.0)
///     .build()
///     .expect("valid config");
///
/// assert_eq!(config.target_std_error(), Some(500.0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct MonteCarloConfigBuilder {
    n_paths: Option<usize>,
    seed: Option<u64>,
    antithetic: bool,
    steps_per_year: Option<usize>,
    chunk_size: Option<usize>,
    degeneracy_policy: DegeneracyPolicy,
    max_discard_fraction: Option<f64>,
    target_std_error: Option<f64>,
    track_autocall_probabilities: bool,
    variance_ceiling: Option<f64>,
    allow_feller_violation: bool,
}

impl MonteCarloConfigBuilder {
    /// Default seed.
    pub const DEFAULT_SEED: u64 = 42;
    /// Default time-grid refinement (weekly).
    pub const DEFAULT_STEPS_PER_YEAR: usize = 52;
    /// Default paths per chunk.
    pub const DEFAULT_CHUNK_SIZE: usize = 1024;
    /// Default discard budget.
    pub const DEFAULT_MAX_DISCARD_FRACTION: f64 = 0.01;

    /// Sets the number of simulation paths, in [1, 10_000_000].
    #[inline]
    pub fn n_paths(mut self, n_paths: usize) -> Self {
        self.n_paths = Some(n_paths);
        self
    }

    /// Sets the seed for reproducibility.
    #[inline]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Simulate antithetic pairs.
    #[inline]
    pub fn antithetic(mut self, antithetic: bool) -> Self {
        self.antithetic = antithetic;
        self
    }

    /// Sets the time-grid refinement, in [1, 10_000] steps per year.
    #[inline]
    pub fn steps_per_year(mut self, steps: usize) -> Self {
        self.steps_per_year = Some(steps);
        self
    }

    /// Sets the number of paths per independently seeded chunk.
    #[inline]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Sets the degenerate-trial policy.
    #[inline]
    pub fn degeneracy_policy(mut self, policy: DegeneracyPolicy) -> Self {
        self.degeneracy_policy = policy;
        self
    }

    /// Sets the discard budget as a fraction of `n_paths`.
    #[inline]
    pub fn max_discard_fraction(mut self, fraction: f64) -> Self {
        self.max_discard_fraction = Some(fraction);
        self
    }

    /// Stop once the standard error falls to `target`.
    #[inline]
    pub fn target_std_error(mut self, target: f64) -> Self {
        self.target_std_error = Some(target);
        self
    }

    /// Collect per-date autocall probabilities.
    #[inline]
    pub fn track_autocall_probabilities(mut self, track: bool) -> Self {
        self.track_autocall_probabilities = track;
        self
    }

    /// Sets the variance ceiling.
    #[inline]
    pub fn variance_ceiling(mut self, ceiling: f64) -> Self {
        self.variance_ceiling = Some(ceiling);
        self
    }

    /// Simulate Feller-violating parameters (with a warning) instead of
    /// rejecting them.
    #[inline]
    pub fn allow_feller_violation(mut self, allow: bool) -> Self {
        self.allow_feller_violation = allow;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `n_paths` is not set or any setting fails
    /// [`MonteCarloConfig::validate`].
    pub fn build(self) -> Result<MonteCarloConfig, ConfigError> {
        let n_paths = self.n_paths.ok_or(ConfigError::InvalidParameter {
            name: "n_paths",
            value: "must be specified".to_string(),
        })?;

        let config = MonteCarloConfig {
            n_paths,
            seed: self.seed.unwrap_or(Self::DEFAULT_SEED),
            antithetic: self.antithetic,
            steps_per_year: self.steps_per_year.unwrap_or(Self::DEFAULT_STEPS_PER_YEAR),
            chunk_size: self.chunk_size.unwrap_or(Self::DEFAULT_CHUNK_SIZE),
            degeneracy_policy: self.degeneracy_policy,
            max_discard_fraction: self
                .max_discard_fraction
                .unwrap_or(Self::DEFAULT_MAX_DISCARD_FRACTION),
            target_std_error: self.target_std_error,
            track_autocall_probabilities: self.track_autocall_probabilities,
            variance_ceiling: self.variance_ceiling.unwrap_or(DEFAULT_VARIANCE_CEILING),
            allow_feller_violation: self.allow_feller_violation,
        };

        config.validate()?;
        Ok(config)
    }
}
