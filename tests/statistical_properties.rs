//! Statistical property tests for the counterfactual estimator
//!
//! Properties that must hold for any input: band ordering across confidence
//! levels, determinism, invariance to scaling and monotonicity of the test in
//! the size of the effect.

use assert_approx_eq::assert_approx_eq;
use causal_finance::{
    estimate_impact, CounterfactualEstimator, ImpactConfig, MergedTable, Period,
};
use chrono::{Days, NaiveDate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::StandardNormal;

struct Scenario {
    table: MergedTable,
    pre: Period,
    post: Period,
}

/// y = 0.7·c1 + 0.3·c2 + σ·ε over `n` rows; `lift` is added over the last `n_post` rows.
fn scenario(n: usize, n_post: usize, sigma: f64, lift: f64, seed: u64) -> Scenario {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let dates: Vec<NaiveDate> = (0..n as u64).map(|i| start + Days::new(i)).collect();

    let c1: Vec<f64> = (0..n)
        .map(|_| 40.0 + 4.0 * rng.sample::<f64, _>(StandardNormal))
        .collect();
    let c2: Vec<f64> = (0..n)
        .map(|_| 80.0 + 6.0 * rng.sample::<f64, _>(StandardNormal))
        .collect();
    let y: Vec<f64> = (0..n)
        .map(|i| {
            let effect = if i >= n - n_post { lift } else { 0.0 };
            0.7 * c1[i] + 0.3 * c2[i] + sigma * rng.sample::<f64, _>(StandardNormal) + effect
        })
        .collect();

    let pre = Period::new(dates[0], dates[n - n_post - 1]).unwrap();
    let post = Period::new(dates[n - n_post], dates[n - 1]).unwrap();
    let table = MergedTable::from_columns(
        dates,
        "Y",
        y,
        vec![("C1".to_string(), c1), ("C2".to_string(), c2)],
    )
    .unwrap();
    Scenario { table, pre, post }
}

#[test]
fn test_band_width_grows_with_confidence() {
    let s = scenario(100, 20, 1.0, 0.0, 1);
    let widths: Vec<Vec<f64>> = [0.10, 0.05, 0.01]
        .iter()
        .map(|&alpha| {
            let config = ImpactConfig::default().with_significance_level(alpha);
            let result = CounterfactualEstimator::new(config)
                .unwrap()
                .estimate(&s.table, &s.pre, &s.post)
                .unwrap();
            result.confidence_bands.iter().map(|b| b.width()).collect()
        })
        .collect();

    for row in 0..20 {
        assert!(widths[0][row] < widths[1][row]);
        assert!(widths[1][row] < widths[2][row]);
    }
}

#[test]
fn test_bands_centered_on_prediction() {
    let s = scenario(80, 10, 0.5, 2.0, 2);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    let sigma2 = result.model.residual_variance;

    for ((band, pred), variance) in result
        .confidence_bands
        .iter()
        .zip(result.post_predicted())
        .zip(&result.forecast_variance)
    {
        assert_approx_eq!((band.lower + band.upper) / 2.0, *pred, 1e-9);
        // Forecast variance is never below the residual variance
        assert!(*variance >= sigma2);
        assert_approx_eq!(band.width() / 2.0, 1.959964 * variance.sqrt(), 1e-5);
    }
}

#[test]
fn test_cumulative_band_agrees_with_verdict() {
    // Small lifts sit near the detection threshold, where the two must still agree
    for (seed, lift) in [(1, 0.0), (2, 0.3), (3, 0.6), (4, 1.0), (5, 2.0), (6, -1.0)] {
        let s = scenario(100, 20, 1.0, lift, seed);
        let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();

        assert_eq!(
            result.effect_detected,
            !result.cumulative_band_contains_actual(),
            "lift {}: p = {}, sum = {}, band = {:?}",
            lift,
            result.p_value,
            result.sum_actual(),
            result.cumulative_band
        );

        let sigma = result.model.residual_std();
        assert_approx_eq!(
            result.cumulative_band.width(),
            2.0 * 1.959964 * sigma * (20.0_f64).sqrt(),
            1e-4
        );
        assert_approx_eq!(result.average_band.width() * 20.0, result.cumulative_band.width(), 1e-9);
        assert!(result.cumulative_band.contains(result.sum_predicted()));
    }
}

#[test]
fn test_detected_lift_lies_outside_average_band() {
    let s = scenario(100, 20, 1.0, 1.0, 1);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    if result.effect_detected {
        assert!(!result.average_band.contains(result.mean_actual));
        assert!(!result.report().contains("was not detected"));
    } else {
        assert!(result.average_band.contains(result.mean_actual));
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let s = scenario(90, 15, 1.0, 1.5, 3);
    let first = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    let second = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.report(), second.report());
}

#[test]
fn test_scaling_target_and_controls() {
    let s = scenario(70, 10, 1.0, 3.0, 4);
    let base = estimate_impact(&s.table, &s.pre, &s.post).unwrap();

    let factor = 1000.0;
    let scaled = MergedTable::from_columns(
        s.table.timestamps().to_vec(),
        "Y",
        s.table.target().iter().map(|v| v * factor).collect(),
        s.table
            .control_names()
            .iter()
            .cloned()
            .zip(
                s.table
                    .controls()
                    .iter()
                    .map(|c| c.iter().map(|v| v * factor).collect::<Vec<f64>>()),
            )
            .collect(),
    )
    .unwrap();
    let result = estimate_impact(&scaled, &s.pre, &s.post).unwrap();

    for (a, b) in base.model.coefficients.iter().zip(&result.model.coefficients) {
        assert_approx_eq!(*a, *b, 1e-8);
    }
    assert_approx_eq!(result.cumulative_impact / factor, base.cumulative_impact, 1e-6);
    assert_approx_eq!(result.z_statistic.unwrap(), base.z_statistic.unwrap(), 1e-6);
    assert_approx_eq!(result.relative_effect.unwrap(), base.relative_effect.unwrap(), 1e-9);
}

#[test]
fn test_p_value_decreases_with_lift() {
    let mut last_p = f64::INFINITY;
    let mut last_z = f64::NEG_INFINITY;
    for lift in [1.0, 1.5, 2.0, 4.0] {
        // Same seed: only the lift differs
        let s = scenario(100, 20, 1.0, lift, 5);
        let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
        let z = result.z_statistic.unwrap();
        assert!(z > last_z);
        assert!(result.p_value <= last_p);
        last_z = z;
        last_p = result.p_value;
    }
    assert!(last_p < 1e-6);
}

#[test]
fn test_negative_effect_sign() {
    let s = scenario(100, 20, 0.5, -3.0, 6);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    assert!(result.cumulative_impact < 0.0);
    assert!(result.z_statistic.unwrap() < 0.0);
    assert!(result.relative_effect.unwrap() < 0.0);
    assert!(result.effect_detected);
    assert!(result.report().contains("decrease"));
}

#[test]
fn test_cumulative_series_is_running_sum() {
    let s = scenario(60, 12, 1.0, 1.0, 8);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    let mut running = 0.0;
    for (impact, cumulative) in result
        .pointwise_impact
        .iter()
        .zip(&result.cumulative_impact_series)
    {
        running += impact;
        assert_approx_eq!(running, *cumulative, 1e-9);
    }
    assert_approx_eq!(result.cumulative_impact, running, 1e-12);
    assert_approx_eq!(
        result.cumulative_impact,
        result.sum_actual() - result.sum_predicted(),
        1e-8
    );
}

#[test]
fn test_residual_variance_recovers_noise_level() {
    let s = scenario(400, 20, 2.0, 0.0, 9);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();
    // σ² = 4 with 378 degrees of freedom
    assert_approx_eq!(result.model.residual_variance, 4.0, 0.8);
    assert_eq!(result.model.degrees_of_freedom, 378);
}

#[test]
fn test_relative_effect_undefined_for_zero_counterfactual() {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let dates: Vec<NaiveDate> = (0..12).map(|i| start + Days::new(i)).collect();
    // Post-period control values sum to zero, so the prediction does too
    let control = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, -2.0, 2.0, -1.0, 1.0];
    let target: Vec<f64> = control
        .iter()
        .enumerate()
        .map(|(i, c)| 3.0 * c + if i % 2 == 0 { 0.1 } else { -0.1 })
        .collect();
    let table =
        MergedTable::from_columns(dates.clone(), "Y", target, vec![("C".to_string(), control)])
            .unwrap();

    let pre = Period::new(dates[0], dates[7]).unwrap();
    let post = Period::new(dates[8], dates[11]).unwrap();
    let result = estimate_impact(&table, &pre, &post).unwrap();
    assert!(result.relative_effect.is_none());
    assert!(result.report().contains("undefined"));
}

#[cfg(feature = "serde")]
#[test]
fn test_result_serializes_to_json() {
    let s = scenario(60, 10, 1.0, 1.0, 10);
    let result = estimate_impact(&s.table, &s.pre, &s.post).unwrap();

    let json = serde_json::to_string(&result).unwrap();
    let restored: causal_finance::ImpactResult = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.metadata, result.metadata);
    assert_eq!(restored.report, result.report);
    assert_eq!(restored.effect_detected, result.effect_detected);
}
