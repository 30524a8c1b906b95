//! Calibration round trip: build a surface from known parameters through
//! an oracle, then recover them from perturbed starting points.

use approx::assert_relative_eq;
use pricer_core::market_data::{MarketEnvironment, VolSurface, VolSurfacePoint};
use pricer_core::types::Date;
use pricer_models::calibration::{
    calibrate_heston, FellerPolicy, HestonCalibrationConfig, HestonCalibrator, OracleError,
};
use pricer_models::models::HestonParameters;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn env() -> MarketEnvironment {
    MarketEnvironment::builder(Date::from_ymd(2024, 7, 20).unwrap(), 79.98)
        .risk_free_rate(0.02)
        .dividend_yield(0.028)
        .build()
        .unwrap()
}

/// Smooth stand-in for a semi-analytic Heston pricer.
///
/// ATM variance is the expected average variance over `[0, T]`; skew and
/// curvature scale with `rho sigma` and `sigma^2 (1 - rho^2)` and decay
/// with `kappa T`, so every parameter moves the surface differently.
fn synthetic_vol(p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64) -> f64 {
    let a = p.kappa() * t;
    let h = (1.0 - (-a).exp()) / a;
    let g = (1.0 - h) / a;
    let w = p.theta() + (p.v0() - p.theta()) * h;
    let x = (k / env.forward(t)).ln();
    w.sqrt()
        + p.rho() * p.sigma() * g * x / (2.0 * w.sqrt())
        + p.sigma() * p.sigma() * (1.0 - p.rho() * p.rho()) * g * x * x / (4.0 * w)
}

fn oracle(p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64) -> Result<f64, OracleError> {
    Ok(synthetic_vol(p, env, t, k))
}

fn truth() -> HestonParameters {
    HestonParameters::new(0.04, 1.5, 0.06, 0.3, -0.6).unwrap()
}

fn market_surface(env: &MarketEnvironment) -> VolSurface {
    let expiries = [
        Date::from_ymd(2024, 10, 21).unwrap(),
        Date::from_ymd(2025, 1, 20).unwrap(),
        Date::from_ymd(2025, 7, 21).unwrap(),
        Date::from_ymd(2026, 7, 20).unwrap(),
        Date::from_ymd(2027, 7, 20).unwrap(),
    ];
    let strikes: Vec<f64> = [0.8, 0.9, 1.0, 1.1, 1.2]
        .iter()
        .map(|m| m * env.spot())
        .collect();

    let mut points = Vec::new();
    for &expiry in &expiries {
        for &strike in &strikes {
            let t = env.time_to(expiry);
            let vol = synthetic_vol(&truth(), env, t, strike);
            points.push(VolSurfacePoint::from_date(env, expiry, strike, vol).unwrap());
        }
    }
    VolSurface::new(points).unwrap()
}

#[test]
fn test_round_trip_from_perturbed_guess() {
    init_tracing();
    let env = env();
    let surface = market_surface(&env);

    let guesses = [
        HestonParameters::new(0.06, 1.0, 0.05, 0.4, -0.4).unwrap(),
        HestonParameters::new(0.03, 2.0, 0.08, 0.25, -0.7).unwrap(),
    ];
    for guess in &guesses {
        let result = calibrate_heston(&surface, &env, guess, &oracle).unwrap();

        assert!(result.converged, "termination {:?}", result.diagnostics.termination);
        assert!(result.feller_satisfied);
        for (fit, expected) in result.parameters.to_array().iter().zip(truth().to_array()) {
            assert_relative_eq!(*fit, expected, max_relative = 1e-3);
        }
        assert!(result.rmse() < 1e-6);
        assert_eq!(result.diagnostics.vol_errors.len(), surface.len());
    }
}

#[test]
fn test_strict_mode_accepts_feller_consistent_fit() {
    init_tracing();
    let env = env();
    let surface = market_surface(&env);
    let guess = HestonParameters::new(0.06, 1.0, 0.05, 0.25, -0.4).unwrap();
    assert!(guess.satisfies_feller());

    let config = HestonCalibrationConfig::default().with_feller_policy(FellerPolicy::Strict);
    let result = HestonCalibrator::with_config(config)
        .calibrate(&surface, &env, &guess, &oracle)
        .unwrap();

    assert!(result.is_success());
    assert_relative_eq!(result.parameters.sigma(), 0.3, max_relative = 1e-3);
}

#[test]
fn test_persistent_oracle_failure_is_isolated() {
    init_tracing();
    let env = env();
    let surface = market_surface(&env);
    let bad = surface.points()[0];

    // One quote can never be priced; the rest still pin the parameters
    let patchy = move |p: &HestonParameters, env: &MarketEnvironment, t: f64, k: f64| {
        if t == bad.expiry && k == bad.strike {
            Err(OracleError::Retryable("characteristic function overflow".into()))
        } else {
            Ok(synthetic_vol(p, env, t, k))
        }
    };

    let guess = HestonParameters::new(0.06, 1.0, 0.05, 0.4, -0.4).unwrap();
    let result = HestonCalibrator::new()
        .calibrate(&surface, &env, &guess, &patchy)
        .unwrap();

    assert_eq!(result.diagnostics.failed_points, 1);
    assert!(result.diagnostics.vol_errors[0].is_nan());
    assert!(!result.diagnostics.is_quality_acceptable(1.0));
    for (fit, expected) in result.parameters.to_array().iter().zip(truth().to_array()) {
        assert_relative_eq!(*fit, expected, max_relative = 1e-3);
    }
}
