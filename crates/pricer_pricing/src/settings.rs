//! Engine settings loaded from TOML.
//!
//! [`EngineSettings`] groups the Monte Carlo, calibration and logging
//! tables of one settings file. Every field has a default, so an empty
//! file is valid. The typed configurations are re-validated on conversion.
//!
//! ```toml
//! [monte_carlo]
//! n_paths = 200000
//! antithetic = true
//! seed = 7
//! degeneracy_policy = "abort"
//!
//! [calibration]
//! feller_policy = "strict"
//! oracle_retries = 3
//!
//! [calibration.lm]
//! max_iterations = 200
//!
//! [logging]
//! level = "debug"
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use pricer_models::calibration::{CalibrationError, HestonCalibrationConfig};
use pricer_models::models::DEFAULT_VARIANCE_CEILING;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mc::{ConfigError, DegeneracyPolicy, MonteCarloConfig, MonteCarloConfigBuilder};

/// Errors loading engine settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Settings file could not be read.
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// Settings text is not valid TOML for [`EngineSettings`].
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Unknown log level name.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Log levels a host can install a subscriber with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including per-iteration solver events.
    Trace,
    /// Per-batch and per-iteration progress.
    Debug,
    /// Start and finish of pricing and calibration.
    #[default]
    Info,
    /// Discards, Feller violations, non-convergence.
    Warn,
    /// Errors only.
    Error,
}

impl FromStr for LogLevel {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(SettingsError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Convert log level to tracing filter string
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

/// `[logging]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Level for the host's `EnvFilter`.
    pub level: LogLevel,
}

/// `[monte_carlo]` table; see [`MonteCarloConfigBuilder`] for meanings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloSettings {
    /// Simulated paths.
    pub n_paths: usize,
    /// Master seed.
    pub seed: u64,
    /// Antithetic pairing.
    pub antithetic: bool,
    /// Grid refinement.
    pub steps_per_year: usize,
    /// Paths per chunk.
    pub chunk_size: usize,
    /// Degenerate-trial policy.
    pub degeneracy_policy: DegeneracyPolicy,
    /// Discard budget as a fraction of `n_paths`.
    pub max_discard_fraction: f64,
    /// Early-termination target.
    pub target_std_error: Option<f64>,
    /// Collect autocall probabilities.
    pub track_autocall_probabilities: bool,
    /// Variance ceiling.
    pub variance_ceiling: f64,
    /// Simulate Feller-violating parameters.
    pub allow_feller_violation: bool,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            n_paths: 100_000,
            seed: MonteCarloConfigBuilder::DEFAULT_SEED,
            antithetic: false,
            steps_per_year: MonteCarloConfigBuilder::DEFAULT_STEPS_PER_YEAR,
            chunk_size: MonteCarloConfigBuilder::DEFAULT_CHUNK_SIZE,
            degeneracy_policy: DegeneracyPolicy::default(),
            max_discard_fraction: MonteCarloConfigBuilder::DEFAULT_MAX_DISCARD_FRACTION,
            target_std_error: None,
            track_autocall_probabilities: false,
            variance_ceiling: DEFAULT_VARIANCE_CEILING,
            allow_feller_violation: false,
        }
    }
}

/// Complete engine settings.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::settings::{EngineSettings, LogLevel};
///
/// let settings = EngineSettings::from_toml_str(
///     r#"
///     [monte_carlo]
///     n_paths = 50000
///     antithetic = true
///
///     [logging]
///     level = "warn"
///     "#,
/// )
/// .unwrap();
///
/// let config = settings.monte_carlo_config().unwrap();
/// assert_eq!(config.n_samples(), 25_000);
/// assert_eq!(settings.logging.level, LogLevel::Warn);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Monte Carlo pricing.
    pub monte_carlo: MonteCarloSettings,
    /// Heston calibration.
    pub calibration: HestonCalibrationConfig,
    /// Logging.
    pub logging: LoggingSettings,
}

impl EngineSettings {
    /// Parses settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validated Monte Carlo configuration.
    pub fn monte_carlo_config(&self) -> Result<MonteCarloConfig, ConfigError> {
        let mc = &self.monte_carlo;
        let mut builder = MonteCarloConfig::builder()
            .n_paths(mc.n_paths)
            .seed(mc.seed)
            .antithetic(mc.antithetic)
            .steps_per_year(mc.steps_per_year)
            .chunk_size(mc.chunk_size)
            .degeneracy_policy(mc.degeneracy_policy)
            .max_discard_fraction(mc.max_discard_fraction)
            .track_autocall_probabilities(mc.track_autocall_probabilities)
            .variance_ceiling(mc.variance_ceiling)
            .allow_feller_violation(mc.allow_feller_violation);
        if let Some(target) = mc.target_std_error {
            builder = builder.target_std_error(target);
        }
        builder.build()
    }

    /// Validated calibration configuration.
    pub fn calibration_config(&self) -> Result<HestonCalibrationConfig, CalibrationError> {
        self.calibration.validate()?;
        Ok(self.calibration.clone())
    }
}
