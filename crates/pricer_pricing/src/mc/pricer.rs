//! Monte Carlo pricing engine for autocallable notes.
//!
//! # Overview
//!
//! The [`MonteCarloPricer`] coordinates:
//! 1. Input validation (market, model, fixings) before any simulation
//! 2. Time grid construction through the live observation dates
//! 3. Chunked path simulation on rayon's pool, one independent
//!    [`PricerRng`] stream per chunk
//! 4. Payoff evaluation and per-chunk [`PathStatistics`]
//! 5. Ordered merge of the chunk statistics into a [`PricingResult`]
//!
//! Chunk statistics are merged in chunk order, so the estimate does not
//! depend on the number of worker threads.

use pricer_core::market_data::MarketEnvironment;
use pricer_core::types::Date;
use pricer_models::instruments::AutocallableNote;
use pricer_models::models::{HestonModel, HestonParameters};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use super::config::{DegeneracyPolicy, MonteCarloConfig};
use super::error::{ConfigError, PricingError, SimulationError};
use super::paths::{HestonPathSimulator, TimeGrid};
use super::payoff::PayoffEvaluator;
use super::workspace::PathWorkspace;
use crate::rng::PricerRng;

/// Chunks priced between convergence checks when a target standard error
/// is set. Fixed so that early termination is reproducible.
pub const EARLY_TERMINATION_BATCH: usize = 8;

/// Probability that the note is called on one observation date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutocallProbability {
    /// Observation date.
    pub date: Date,
    /// Fraction of simulated paths called on this date.
    pub probability: f64,
}

/// Result of a Monte Carlo pricing call.
///
/// # Examples
///
/// ```rust
/// use pricer_pricing::mc::PricingResult;
///
/// let result = PricingResult {
///     present_value: 1_010_000.0,
///     standard_error: 500.0,
///     num_paths: 100_000,
///     num_samples: 100_000,
///     ..Default::default()
/// };
///
/// assert!((result.confidence_95() - 980.0).abs() < 1e-9);
/// assert!((result.percent_of_notional(1_000_000.0) - 101.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PricingResult {
    /// Present value of the remaining cash flows.
    pub present_value: f64,
    /// Standard error of the estimate over independent samples.
    pub standard_error: f64,
    /// Simulated paths used in the estimate (twins included).
    pub num_paths: usize,
    /// Independent samples: antithetic pairs count once.
    pub num_samples: usize,
    /// Degenerate paths discarded and redrawn.
    pub discarded_paths: usize,
    /// Whether pricing stopped on reaching the target standard error.
    pub early_terminated: bool,
    /// Whether the final standard error meets `target_std_error`; `None`
    /// when no target was set.
    pub target_met: Option<bool>,
    /// Per-date autocall probabilities, when requested.
    pub autocall_probabilities: Option<Vec<AutocallProbability>>,
}

impl PricingResult {
    /// Returns the 95% confidence interval half-width.
    #[inline]
    pub fn confidence_95(&self) -> f64 {
        1.96 * self.standard_error
    }

    /// Returns the 99% confidence interval half-width.
    #[inline]
    pub fn confidence_99(&self) -> f64 {
        2.576 * self.standard_error
    }

    /// Present value as a percentage of `notional`.
    #[inline]
    pub fn percent_of_notional(&self, notional: f64) -> f64 {
        100.0 * self.present_value / notional
    }
}

/// Running sample statistics of one work chunk.
///
/// Accumulates with Welford's update and merges with Chan's pairwise
/// formula, so chunks can be combined in any fixed order without
/// catastrophic cancellation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathStatistics {
    count: usize,
    mean: f64,
    m2: f64,
    paths: usize,
    discarded: usize,
    autocall_counts: Vec<usize>,
}

impl PathStatistics {
    /// Empty statistics tracking `n_dates` autocall counters (0 disables).
    pub fn new(n_dates: usize) -> Self {
        Self {
            autocall_counts: vec![0; n_dates],
            ..Default::default()
        }
    }

    /// Adds one independent sample.
    #[inline]
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: &PathStatistics) {
        if other.count > 0 {
            if self.count == 0 {
                self.count = other.count;
                self.mean = other.mean;
                self.m2 = other.m2;
            } else {
                let n_a = self.count as f64;
                let n_b = other.count as f64;
                let n = n_a + n_b;
                let delta = other.mean - self.mean;
                self.mean += delta * n_b / n;
                self.m2 += other.m2 + delta * delta * n_a * n_b / n;
                self.count += other.count;
            }
        }
        self.paths += other.paths;
        self.discarded += other.discarded;
        for (mine, theirs) in self.autocall_counts.iter_mut().zip(&other.autocall_counts) {
            *mine += theirs;
        }
    }

    /// Number of samples.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sample mean.
    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance (0 below two samples).
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard error of the mean.
    #[inline]
    pub fn std_error(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.variance() / self.count as f64).sqrt()
        }
    }

    fn record_autocall(&mut self, index: Option<usize>) {
        if let Some(slot) = index.and_then(|k| self.autocall_counts.get_mut(k)) {
            *slot += 1;
        }
    }
}

/// Monte Carlo pricer for autocallable notes under Heston dynamics.
///
/// The pricer holds only its configuration; every call builds its model,
/// grid and workspaces afresh, so one pricer can be shared between threads.
///
/// # Examples
///
/// ```rust
/// use pricer_core::market_data::MarketEnvironment;
/// use pricer_core::types::Date;
/// use pricer_models::instruments::AutocallableNote;
/// use pricer_models::models::HestonParameters;
/// use pricer_pricing::mc::{MonteCarloConfig, MonteCarloPricer};
///
/// let env = MarketEnvironment::builder(Date::from_ymd(2024, 1, 2).unwrap(), 100.0)
///     .risk_free_rate(0.02)
///     .build()
///     .unwrap();
/// let note = AutocallableNote::phoenix(
///     vec![Date::from_ymd(2024, 7, 2).unwrap(), Date::from_ymd(2025, 1, 2).unwrap()],
///     1_000_000.0,
///     100.0,
///     0.04,
///     0.7,
///     0.6,
/// )
/// .build()
/// .unwrap();
/// let params = HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap();
///
/// let config = MonteCarloConfig::builder().n_paths(2_000).seed(7).build().unwrap();
/// let pricer = MonteCarloPricer::new(config).unwrap();
/// let result = pricer.price(&params, &env, &note).unwrap();
///
/// println!("PV: {:.2} +/- {:.2}", result.present_value, result.confidence_95());
/// assert_eq!(result.num_paths, 2_000);
/// ```
#[derive(Clone, Debug)]
pub struct MonteCarloPricer {
    config: MonteCarloConfig,
}

impl MonteCarloPricer {
    /// Creates a new pricer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration is invalid.
    pub fn new(config: MonteCarloConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns a reference to the configuration.
    #[inline]
    pub fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Prices `note` under Heston `params` in `env`.
    ///
    /// # Errors
    ///
    /// Input errors are raised before any path is simulated:
    /// * `InvalidMarket` - spot or rates invalid
    /// * `InvalidParameter` - bounds, Feller (unless allowed) or ceiling
    /// * `InvalidProductSpec` - fixings inconsistent with valuation
    ///
    /// Degenerate trials yield `Simulation` under
    /// [`DegeneracyPolicy::Abort`] and `NumericalDegeneracy` once the
    /// discard budget is exhausted under [`DegeneracyPolicy::Resample`].
    #[instrument(
        skip_all,
        fields(
            n_paths = self.config.n_paths(),
            seed = self.config.seed(),
            antithetic = self.config.antithetic()
        )
    )]
    pub fn price(
        &self,
        params: &HestonParameters,
        env: &MarketEnvironment,
        note: &AutocallableNote,
    ) -> Result<PricingResult, PricingError> {
        env.validate()?;

        let model = if self.config.allow_feller_violation() {
            HestonModel::allowing_feller_violation(*params)?
        } else {
            HestonModel::new(*params)?
        };
        let model = model.with_variance_ceiling(self.config.variance_ceiling())?;

        let evaluator = PayoffEvaluator::new(note, env)?;
        let track = self.config.track_autocall_probabilities();

        if evaluator.is_terminated() {
            info!(
                status = ?evaluator.settled_state().status(),
                "note has no remaining cash flows"
            );
            let empty = PathStatistics::default();
            return Ok(PricingResult {
                target_met: self.config.target_std_error().map(|_| true),
                autocall_probabilities: track.then(|| probabilities(&evaluator, &empty)),
                ..Default::default()
            });
        }

        let grid = TimeGrid::new(evaluator.live_times(), self.config.steps_per_year())?;
        let simulator = HestonPathSimulator::new(model, env)?;

        let total_samples = self.config.n_samples();
        let per_chunk = self.config.samples_per_chunk();
        let n_chunks = total_samples.div_ceil(per_chunk);
        let batch = match self.config.target_std_error() {
            Some(_) => EARLY_TERMINATION_BATCH,
            None => n_chunks,
        };
        let n_dates = if track { evaluator.live_dates().len() } else { 0 };

        info!(
            live_dates = evaluator.live_dates().len(),
            steps = grid.n_steps(),
            chunks = n_chunks,
            "starting Monte Carlo pricing"
        );

        let mut total = PathStatistics::new(n_dates);
        let mut early_terminated = false;
        let mut start = 0;

        while start < n_chunks {
            let end = (start + batch).min(n_chunks);

            let chunk_stats = (start..end)
                .into_par_iter()
                .map(|chunk| {
                    let samples = per_chunk.min(total_samples - chunk * per_chunk);
                    self.run_chunk(chunk, samples, n_dates, &simulator, &grid, &evaluator)
                })
                .collect::<Result<Vec<_>, _>>()?;

            for stats in &chunk_stats {
                total.merge(stats);
            }
            self.check_discards(&total)?;

            debug!(
                chunks_done = end,
                samples = total.count(),
                mean = total.mean(),
                std_error = total.std_error(),
                "batch complete"
            );

            if let Some(target) = self.config.target_std_error() {
                if end < n_chunks && total.count() >= 2 && total.std_error() <= target {
                    early_terminated = true;
                    break;
                }
            }
            start = end;
        }

        if total.discarded > 0 {
            warn!(
                discarded = total.discarded,
                attempted = total.paths + total.discarded,
                "degenerate paths discarded and redrawn"
            );
        }

        let target_met = self
            .config
            .target_std_error()
            .map(|target| total.count() >= 2 && total.std_error() <= target);
        if target_met == Some(false) {
            warn!(
                std_error = total.std_error(),
                target = self.config.target_std_error(),
                num_paths = total.paths,
                "path budget exhausted before reaching the target standard error"
            );
        }

        let result = PricingResult {
            present_value: total.mean(),
            standard_error: total.std_error(),
            num_paths: total.paths,
            num_samples: total.count(),
            discarded_paths: total.discarded,
            early_terminated,
            target_met,
            autocall_probabilities: track.then(|| probabilities(&evaluator, &total)),
        };

        info!(
            present_value = result.present_value,
            std_error = result.standard_error,
            num_paths = result.num_paths,
            early_terminated,
            "Monte Carlo pricing complete"
        );
        Ok(result)
    }

    fn run_chunk(
        &self,
        chunk: usize,
        samples: usize,
        n_dates: usize,
        simulator: &HestonPathSimulator,
        grid: &TimeGrid,
        evaluator: &PayoffEvaluator<'_>,
    ) -> Result<PathStatistics, PricingError> {
        let antithetic = self.config.antithetic();
        let paths_per_sample = if antithetic { 2 } else { 1 };

        let mut rng = PricerRng::for_stream(self.config.seed(), chunk as u64);
        let mut workspace = PathWorkspace::new(grid);
        let mut stats = PathStatistics::new(n_dates);

        while stats.count() < samples {
            let trial = workspace
                .run_trial(simulator, grid, &mut rng, antithetic)
                .and_then(|()| {
                    let primary = evaluator.evaluate(workspace.primary().observed_levels());
                    let twin = antithetic
                        .then(|| evaluator.evaluate(workspace.twin().observed_levels()));
                    let sample = match &twin {
                        Some(twin) => 0.5 * (primary.value + twin.value),
                        None => primary.value,
                    };
                    if sample.is_finite() {
                        Ok((sample, primary, twin))
                    } else {
                        Err(SimulationError::NonFinitePayoff { value: sample })
                    }
                });

            let (sample, primary, twin) = match trial {
                Ok(outcome) => outcome,
                Err(err) => match self.config.degeneracy_policy() {
                    DegeneracyPolicy::Abort => return Err(err.into()),
                    DegeneracyPolicy::Resample => {
                        stats.discarded += paths_per_sample;
                        self.check_discards(&stats)?;
                        continue;
                    }
                },
            };

            stats.record_autocall(primary.autocall_index);
            if let Some(twin) = twin {
                stats.record_autocall(twin.autocall_index);
            }
            stats.paths += paths_per_sample;
            stats.push(sample);
        }

        Ok(stats)
    }

    fn check_discards(&self, stats: &PathStatistics) -> Result<(), PricingError> {
        if stats.discarded > self.config.max_discarded_paths() {
            return Err(PricingError::NumericalDegeneracy {
                discarded: stats.discarded,
                attempted: stats.paths + stats.discarded,
            });
        }
        Ok(())
    }
}

fn probabilities(evaluator: &PayoffEvaluator<'_>, stats: &PathStatistics) -> Vec<AutocallProbability> {
    evaluator
        .live_dates()
        .iter()
        .enumerate()
        .map(|(k, &date)| {
            let called = stats.autocall_counts.get(k).copied().unwrap_or(0);
            let probability = if stats.paths == 0 {
                0.0
            } else {
                called as f64 / stats.paths as f64
            };
            AutocallProbability { date, probability }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_core::types::DayCountConvention;
    use pricer_models::instruments::PayoffFn;

    const N: f64 = 1_000_000.0;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn env_with_rate(rate: f64) -> MarketEnvironment {
        MarketEnvironment::builder(d(2025, 1, 2), 100.0)
            .risk_free_rate(rate)
            .day_count(DayCountConvention::Actual365Fixed)
            .build()
            .unwrap()
    }

    fn params() -> HestonParameters {
        HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap()
    }

    fn quarterly_note() -> AutocallableNote {
        let dates = vec![d(2025, 4, 2), d(2025, 7, 2), d(2025, 10, 2), d(2026, 1, 2)];
        AutocallableNote::phoenix(dates, N, 100.0, 0.02, 0.7, 0.6)
            .memory(true)
            .build()
            .unwrap()
    }

    fn pricer(builder: crate::mc::MonteCarloConfigBuilder) -> MonteCarloPricer {
        MonteCarloPricer::new(builder.build().unwrap()).unwrap()
    }

    // ========================================
    // Statistics
    // ========================================

    #[test]
    fn test_welford_matches_two_pass() {
        let xs = [3.0, 7.5, -1.0, 4.25, 10.0, 0.5];
        let mut stats = PathStatistics::new(0);
        for &x in &xs {
            stats.push(x);
        }
        let mean = xs.iter().sum::<f64>() / 6.0;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 5.0;

        assert_relative_eq!(stats.mean(), mean, epsilon = 1e-12);
        assert_relative_eq!(stats.variance(), var, epsilon = 1e-12);
        assert_relative_eq!(stats.std_error(), (var / 6.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let xs: Vec<f64> = (0..100).map(|i| (i as f64 * 0.37).sin() * 50.0 + 1e6).collect();

        let mut sequential = PathStatistics::new(0);
        xs.iter().for_each(|&x| sequential.push(x));

        let mut merged = PathStatistics::new(0);
        for part in xs.chunks(17) {
            let mut s = PathStatistics::new(0);
            part.iter().for_each(|&x| s.push(x));
            merged.merge(&s);
        }

        assert_eq!(merged.count(), 100);
        assert_relative_eq!(merged.mean(), sequential.mean(), epsilon = 1e-8);
        assert_relative_eq!(merged.variance(), sequential.variance(), max_relative = 1e-9);
    }

    #[test]
    fn test_pricing_result_confidence() {
        let result = PricingResult {
            present_value: 10.0,
            standard_error: 0.1,
            ..Default::default()
        };

        assert_relative_eq!(result.confidence_95(), 1.96 * 0.1, epsilon = 1e-10);
        assert_relative_eq!(result.confidence_99(), 2.576 * 0.1, epsilon = 1e-10);
        assert_relative_eq!(result.percent_of_notional(20.0), 50.0, epsilon = 1e-10);
    }

    // ========================================
    // Pricing
    // ========================================

    #[test]
    fn test_price_counts_paths_and_samples() {
        let p = pricer(
            MonteCarloConfig::builder()
                .n_paths(3_000)
                .antithetic(true)
                .chunk_size(256)
                .seed(11),
        );
        let result = p.price(&params(), &env_with_rate(0.02), &quarterly_note()).unwrap();

        assert_eq!(result.num_paths, 3_000);
        assert_eq!(result.num_samples, 1_500);
        assert_eq!(result.discarded_paths, 0);
        assert!(!result.early_terminated);
        assert!(result.present_value > 0.5 * N && result.present_value < 1.1 * N);
        assert!(result.standard_error > 0.0);
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let p = pricer(MonteCarloConfig::builder().n_paths(4_000).chunk_size(300).seed(5));
        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| p.price(&params(), &env_with_rate(0.02), &quarterly_note()))
                .unwrap()
        };

        let single = run(1);
        let many = run(4);
        assert_eq!(single.present_value.to_bits(), many.present_value.to_bits());
        assert_eq!(single.standard_error.to_bits(), many.standard_error.to_bits());
    }

    #[test]
    fn test_autocall_probabilities_sum_below_one() {
        let p = pricer(
            MonteCarloConfig::builder()
                .n_paths(5_000)
                .seed(3)
                .track_autocall_probabilities(true),
        );
        let result = p.price(&params(), &env_with_rate(0.02), &quarterly_note()).unwrap();
        let probs = result.autocall_probabilities.unwrap();

        assert_eq!(probs.len(), 4);
        assert_eq!(probs[0].date, d(2025, 4, 2));
        // no autocall on the final date
        assert_eq!(probs[3].probability, 0.0);
        let total: f64 = probs.iter().map(|p| p.probability).sum();
        assert!(probs[0].probability > 0.2);
        assert!(total < 1.0);
    }

    #[test]
    fn test_feller_violation_rejected_unless_allowed() {
        let violating = HestonParameters::new(0.04, 0.5, 0.04, 0.5, -0.6).unwrap();
        let env = env_with_rate(0.02);
        let note = quarterly_note();

        let strict = pricer(MonteCarloConfig::builder().n_paths(500));
        assert!(matches!(
            strict.price(&violating, &env, &note),
            Err(PricingError::InvalidParameter(_))
        ));

        let lenient = pricer(
            MonteCarloConfig::builder()
                .n_paths(500)
                .allow_feller_violation(true),
        );
        assert!(lenient.price(&violating, &env, &note).is_ok());
    }

    #[test]
    fn test_abort_policy_surfaces_degenerate_trial() {
        let p = pricer(
            MonteCarloConfig::builder()
                .n_paths(100)
                .degeneracy_policy(DegeneracyPolicy::Abort),
        );
        let result = p.price(&params(), &env_with_rate(1.0e300), &quarterly_note());
        assert!(matches!(
            result,
            Err(PricingError::Simulation(SimulationError::NonFinite { .. }))
        ));
    }

    #[test]
    fn test_resample_policy_reports_exhausted_budget() {
        let p = pricer(MonteCarloConfig::builder().n_paths(1_000));
        let result = p.price(&params(), &env_with_rate(1.0e300), &quarterly_note());
        match result {
            Err(PricingError::NumericalDegeneracy {
                discarded,
                attempted,
            }) => {
                assert_eq!(discarded, 11);
                assert_eq!(attempted, 11);
            }
            other => panic!("expected degeneracy, got {:?}", other),
        }
    }

    fn note_with_nan_below(protection: f64) -> AutocallableNote {
        AutocallableNote::phoenix(vec![d(2026, 1, 2)], N, 100.0, 0.05, 0.7, protection)
            .final_payoff(PayoffFn::new(|_level: f64| f64::NAN))
            .build()
            .unwrap()
    }

    #[test]
    fn test_non_finite_payoff_aborts_under_abort_policy() {
        let p = pricer(
            MonteCarloConfig::builder()
                .n_paths(2_000)
                .degeneracy_policy(DegeneracyPolicy::Abort),
        );
        let result = p.price(&params(), &env_with_rate(0.02), &note_with_nan_below(0.9));
        assert!(matches!(
            result,
            Err(PricingError::Simulation(SimulationError::NonFinitePayoff { .. }))
        ));
    }

    #[test]
    fn test_non_finite_payoff_is_resampled() {
        let p = pricer(
            MonteCarloConfig::builder()
                .n_paths(2_000)
                .max_discard_fraction(1.0)
                .track_autocall_probabilities(true),
        );
        let result = p
            .price(&params(), &env_with_rate(0.02), &note_with_nan_below(0.9))
            .unwrap();

        assert!(result.present_value.is_finite());
        assert!(result.standard_error.is_finite());
        assert!(result.discarded_paths > 0);
        assert_eq!(result.num_paths, 2_000);
        let probs = result.autocall_probabilities.unwrap();
        assert!(probs[0].probability <= 1.0);
    }

    #[test]
    fn test_non_finite_payoff_counts_against_discard_budget() {
        let p = pricer(MonteCarloConfig::builder().n_paths(2_000));
        assert!(matches!(
            p.price(&params(), &env_with_rate(0.02), &note_with_nan_below(0.9)),
            Err(PricingError::NumericalDegeneracy { .. })
        ));
    }

    #[test]
    fn test_missing_fixing_fails_before_simulation() {
        let p = pricer(MonteCarloConfig::builder().n_paths(100));
        let env = MarketEnvironment::builder(d(2025, 5, 1), 100.0)
            .build()
            .unwrap();
        assert!(matches!(
            p.price(&params(), &env, &quarterly_note()),
            Err(PricingError::InvalidProductSpec(_))
        ));
    }
}
