//! End-to-end pricing of autocallable notes.
//!
//! # Test Categories
//!
//! 1. **Regression scenario**: one-year single-observation note, fixed seed
//! 2. **Reproducibility**: identical inputs give bit-identical results
//! 3. **Degenerate products**: unreachable autocall against a direct
//!    coupon-strip simulation
//! 4. **Variance reduction**: antithetic N paths against plain 2N paths
//! 5. **Lifecycle**: settled fixings, terminated notes, early termination

use pricer_core::market_data::MarketEnvironment;
use pricer_core::types::{Date, DayCountConvention};
use pricer_models::instruments::AutocallableNote;
use pricer_models::models::{HestonModel, HestonParameters};
use pricer_pricing::mc::{
    HestonPathSimulator, MonteCarloConfig, MonteCarloPricer, PathStatistics, PricingResult,
    TimeGrid, EARLY_TERMINATION_BATCH,
};
use pricer_pricing::rng::PricerRng;

const NOTIONAL: f64 = 1_000_000.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn d(y: i32, m: u32, day: u32) -> Date {
    Date::from_ymd(y, m, day).unwrap()
}

/// spot = K = 100, r = 2%, q = 0, ACT/365F so the one-year date is t = 1.
fn env_at(valuation: Date) -> MarketEnvironment {
    MarketEnvironment::builder(valuation, 100.0)
        .risk_free_rate(0.02)
        .day_count(DayCountConvention::Actual365Fixed)
        .build()
        .unwrap()
}

fn params() -> HestonParameters {
    HestonParameters::new(0.04, 1.5, 0.04, 0.3, -0.6).unwrap()
}

fn price(config: MonteCarloConfig, env: &MarketEnvironment, note: &AutocallableNote) -> PricingResult {
    MonteCarloPricer::new(config)
        .unwrap()
        .price(&params(), env, note)
        .unwrap()
}

fn one_year_note() -> AutocallableNote {
    AutocallableNote::builder(vec![d(2026, 1, 2)], NOTIONAL, 100.0)
        .autocall_barrier(1.0)
        .coupon_barrier(0.7)
        .protection_barrier(0.6)
        .coupon_rate(0.05)
        .build()
        .unwrap()
}

fn quarterly_dates() -> Vec<Date> {
    vec![d(2025, 4, 2), d(2025, 7, 2), d(2025, 10, 2), d(2026, 1, 2)]
}

// ============================================================================
// Regression scenario
// ============================================================================

/// Baseline for seed 20_240_720 with 100k paths.
const BASELINE_PV: f64 = 1_016_836.03;
const BASELINE_SE: f64 = 233.76;

#[test]
fn test_one_year_note_regression_band() {
    init_tracing();
    let env = env_at(d(2025, 1, 2));
    let config = MonteCarloConfig::builder()
        .n_paths(100_000)
        .seed(20_240_720)
        .build()
        .unwrap();

    let result = price(config, &env, &one_year_note());

    assert!(
        (result.present_value - BASELINE_PV).abs() < 3.0 * BASELINE_SE,
        "PV {} drifted from baseline {}",
        result.present_value,
        BASELINE_PV
    );
    assert!(
        (result.standard_error - BASELINE_SE).abs() < 0.05 * BASELINE_SE,
        "SE {}",
        result.standard_error
    );
    assert_eq!(result.num_paths, 100_000);

    // Bounded by the discounted redemption range: at most N (1 + c) e^{-r}
    let cap = NOTIONAL * 1.05 * (-0.02_f64).exp();
    assert!(result.present_value <= cap + 1e-6);
    assert!(result.percent_of_notional(NOTIONAL) > 101.0);
}

#[test]
fn test_identical_inputs_are_bit_identical() {
    let env = env_at(d(2025, 1, 2));
    let note = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.02, 0.7, 0.6)
        .memory(true)
        .build()
        .unwrap();
    let config = MonteCarloConfig::builder()
        .n_paths(20_000)
        .antithetic(true)
        .seed(99)
        .build()
        .unwrap();

    let a = price(config.clone(), &env, &note);
    let b = price(config, &env, &note);
    assert_eq!(a.present_value.to_bits(), b.present_value.to_bits());
    assert_eq!(a, b);
}

#[test]
fn test_different_seeds_differ() {
    let env = env_at(d(2025, 1, 2));
    let build = |seed| {
        MonteCarloConfig::builder()
            .n_paths(5_000)
            .seed(seed)
            .build()
            .unwrap()
    };
    let a = price(build(1), &env, &one_year_note());
    let b = price(build(2), &env, &one_year_note());
    assert_ne!(a.present_value, b.present_value);
}

// ============================================================================
// Unreachable autocall
// ============================================================================

/// Coupon strip plus maturity redemption, simulated without the engine's
/// payoff evaluator.
fn direct_coupon_strip(env: &MarketEnvironment, n_paths: usize, seed: u64) -> (f64, f64) {
    let dates = quarterly_dates();
    let times: Vec<f64> = dates.iter().map(|&date| env.time_to(date)).collect();
    let dfs: Vec<f64> = times.iter().map(|&t| env.discount_factor(t)).collect();

    let grid = TimeGrid::new(&times, 52).unwrap();
    let sim = HestonPathSimulator::new(HestonModel::new(params()).unwrap(), env).unwrap();
    let mut rng = PricerRng::from_seed(seed);
    let mut stats = PathStatistics::new(0);

    for _ in 0..n_paths {
        let path = sim.simulate(&grid, &mut rng).unwrap();
        let levels: Vec<f64> = path.observed_levels().collect();
        let last = levels.len() - 1;

        let mut value = 0.0;
        for k in 0..last {
            if levels[k] >= 70.0 {
                value += dfs[k] * NOTIONAL * 0.03;
            }
        }
        let s_t = levels[last];
        let redemption = if s_t >= 70.0 {
            NOTIONAL * 1.03
        } else if s_t >= 60.0 {
            NOTIONAL
        } else {
            NOTIONAL * s_t / 100.0
        };
        stats.push(value + dfs[last] * redemption);
    }

    (stats.mean(), stats.std_error())
}

#[test]
fn test_unreachable_autocall_matches_coupon_strip() {
    init_tracing();
    let env = env_at(d(2025, 1, 2));
    let note = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.03, 0.7, 0.6)
        .autocall_barrier(f64::INFINITY)
        .build()
        .unwrap();
    let config = MonteCarloConfig::builder()
        .n_paths(40_000)
        .seed(17)
        .track_autocall_probabilities(true)
        .build()
        .unwrap();

    let engine = price(config, &env, &note);
    let (direct, direct_se) = direct_coupon_strip(&env, 40_000, 4242);

    let tolerance = 4.0 * (engine.standard_error.powi(2) + direct_se.powi(2)).sqrt();
    assert!(
        (engine.present_value - direct).abs() < tolerance,
        "engine {} vs direct {} (tol {})",
        engine.present_value,
        direct,
        tolerance
    );

    let probs = engine.autocall_probabilities.unwrap();
    assert!(probs.iter().all(|p| p.probability == 0.0));
}

// ============================================================================
// Antithetic variates
// ============================================================================

#[test]
fn test_antithetic_agrees_with_plain_sampling() {
    let env = env_at(d(2025, 1, 2));
    let note = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.02, 0.7, 0.6)
        .memory(true)
        .build()
        .unwrap();

    let antithetic = price(
        MonteCarloConfig::builder()
            .n_paths(40_000)
            .antithetic(true)
            .seed(7)
            .build()
            .unwrap(),
        &env,
        &note,
    );
    let plain = price(
        MonteCarloConfig::builder()
            .n_paths(80_000)
            .seed(8)
            .build()
            .unwrap(),
        &env,
        &note,
    );

    // Pairs count once toward the standard error
    assert_eq!(antithetic.num_samples, 20_000);
    assert_eq!(plain.num_samples, 80_000);

    let tolerance = 4.0 * (antithetic.standard_error.powi(2) + plain.standard_error.powi(2)).sqrt();
    assert!(
        (antithetic.present_value - plain.present_value).abs() < tolerance,
        "antithetic {} vs plain {}",
        antithetic.present_value,
        plain.present_value
    );
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_settled_fixings_shift_the_valuation() {
    let note = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.02, 0.7, 0.6)
        .memory(true)
        .past_fixing(d(2025, 4, 2), 65.0)
        .build()
        .unwrap();
    let env = env_at(d(2025, 5, 2));
    let config = MonteCarloConfig::builder()
        .n_paths(10_000)
        .track_autocall_probabilities(true)
        .build()
        .unwrap();

    let result = price(config, &env, &note);
    let probs = result.autocall_probabilities.unwrap();

    assert_eq!(probs.len(), 3);
    assert_eq!(probs[0].date, d(2025, 7, 2));
    assert!(result.present_value > 0.5 * NOTIONAL);
}

#[test]
fn test_note_called_on_settled_date_is_worth_nothing() {
    let note = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.02, 0.7, 0.6)
        .past_fixing(d(2025, 4, 2), 104.0)
        .build()
        .unwrap();
    let config = MonteCarloConfig::builder().n_paths(1_000).build().unwrap();

    let result = price(config, &env_at(d(2025, 5, 2)), &note);
    assert_eq!(result.present_value, 0.0);
    assert_eq!(result.standard_error, 0.0);
    assert_eq!(result.num_paths, 0);
}

#[test]
fn test_matured_note_is_worth_nothing() {
    let mut builder = AutocallableNote::phoenix(quarterly_dates(), NOTIONAL, 100.0, 0.02, 0.7, 0.6);
    for date in quarterly_dates() {
        builder = builder.past_fixing(date, 80.0);
    }
    let note = builder.build().unwrap();
    let config = MonteCarloConfig::builder().n_paths(1_000).build().unwrap();

    let result = price(config, &env_at(d(2026, 3, 1)), &note);
    assert_eq!(result.present_value, 0.0);
    assert!(!result.early_terminated);
}

#[test]
fn test_target_std_error_stops_early() {
    init_tracing();
    let env = env_at(d(2025, 1, 2));
    let config = MonteCarloConfig::builder()
        .n_paths(500_000)
        .chunk_size(1_000)
        .target_std_error(10_000.0)
        .seed(3)
        .build()
        .unwrap();

    let first = price(config.clone(), &env, &one_year_note());
    assert!(first.early_terminated);
    assert_eq!(first.num_paths, EARLY_TERMINATION_BATCH * 1_000);
    assert!(first.standard_error <= 10_000.0);

    let second = price(config, &env, &one_year_note());
    assert_eq!(first, second);
    assert_eq!(first.target_met, Some(true));
}

#[test]
fn test_missed_target_is_flagged() {
    init_tracing();
    let env = env_at(d(2025, 1, 2));
    let config = MonteCarloConfig::builder()
        .n_paths(2_000)
        .chunk_size(100)
        .target_std_error(1.0)
        .build()
        .unwrap();

    let result = price(config, &env, &one_year_note());
    assert!(!result.early_terminated);
    assert_eq!(result.num_paths, 2_000);
    assert!(result.standard_error > 1.0);
    assert_eq!(result.target_met, Some(false));

    let untargeted = price(
        MonteCarloConfig::builder().n_paths(2_000).build().unwrap(),
        &env,
        &one_year_note(),
    );
    assert_eq!(untargeted.target_met, None);
}

// ============================================================================
// Day count edge cases
// ============================================================================

#[test]
fn test_dates_sharing_a_thirty_360_fraction_price() {
    // Under 30/360 from the 30th, 30 and 31 March are both t = 60/360
    let env = MarketEnvironment::builder(d(2025, 1, 30), 100.0)
        .risk_free_rate(0.02)
        .day_count(DayCountConvention::Thirty360)
        .build()
        .unwrap();
    let dates = vec![d(2025, 3, 30), d(2025, 3, 31), d(2026, 1, 2)];
    assert_eq!(env.time_to(dates[0]), env.time_to(dates[1]));

    let note = AutocallableNote::phoenix(dates.clone(), NOTIONAL, 100.0, 0.02, 0.7, 0.6)
        .memory(true)
        .build()
        .unwrap();
    let config = MonteCarloConfig::builder()
        .n_paths(5_000)
        .track_autocall_probabilities(true)
        .build()
        .unwrap();

    let result = price(config, &env, &note);
    assert!(result.present_value.is_finite());
    assert!(result.present_value > 0.5 * NOTIONAL);

    // Same level on both dates: anything called on the second was called on the first
    let probs = result.autocall_probabilities.unwrap();
    assert_eq!(probs.len(), 3);
    assert_eq!(probs[1].date, dates[1]);
    assert_eq!(probs[1].probability, 0.0);
    assert!(probs[0].probability > 0.0);
}
