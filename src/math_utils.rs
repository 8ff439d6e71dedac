//! Mathematical utility functions for impact analysis.
//!
//! Normal-distribution helpers used for bands and significance tests, plus the
//! small descriptive statistics needed by the pre-period diagnostics.

use crate::errors::{validate_parameter, CausalImpactError, CausalResult};
use statrs::distribution::{ContinuousCDF, Normal};

/// Standard normal distribution N(0, 1).
pub fn standard_normal() -> CausalResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|_| CausalImpactError::NumericalError {
        reason: "Failed to create standard normal distribution".to_string(),
        operation: None,
    })
}

/// Φ(x), the standard normal CDF.
pub fn standard_normal_cdf(x: f64) -> CausalResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

/// Φ⁻¹(p) for p strictly inside (0, 1).
pub fn normal_quantile(p: f64) -> CausalResult<f64> {
    validate_parameter(p, f64::MIN_POSITIVE, 1.0 - f64::EPSILON, "probability")?;
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Critical value z(1 − α/2) for a two-sided test at level α.
pub fn two_sided_critical_value(alpha: f64) -> CausalResult<f64> {
    validate_parameter(alpha, f64::MIN_POSITIVE, 1.0 - f64::EPSILON, "significance_level")?;
    normal_quantile(1.0 - alpha / 2.0)
}

/// Two-sided p-value 2·Q(|z|) via the survival function, accurate far into the tail.
///
/// Infinite |z| gives 0.
pub fn two_sided_p_value(z: f64) -> CausalResult<f64> {
    if z.is_nan() {
        return Err(CausalImpactError::NumericalError {
            reason: "z statistic is NaN".to_string(),
            operation: Some("two_sided_p_value".to_string()),
        });
    }
    let p = 2.0 * standard_normal()?.sf(z.abs());
    Ok(p.clamp(0.0, 1.0))
}

/// Arithmetic mean; NaN for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Simple returns `x[i] / x[i-1] − 1`, one shorter than the input.
///
/// A zero previous value yields a non-finite entry; callers filter those out.
pub fn pct_change(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// Pearson correlation of two equal-length samples.
///
/// `None` when lengths differ, fewer than two points are given, or either
/// sample has zero variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let (da, db) = (a - mx, b - my);
        sxy += da * db;
        sxx += da * da;
        syy += db * db;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}
