//! Augmented Dickey-Fuller unit-root test.
//!
//! Regression with constant:
//! `Δy_t = α + β·y_{t−1} + Σ_{i=1..p} γ_i·Δy_{t−i} + ε_t`.
//! H₀ is β = 0 (unit root). The lag order p is chosen by information criterion
//! over a common sample, then the chosen regression is refitted on all usable
//! observations.
//!
//! **P-values are approximate**: they come from MacKinnon's (1994) normal
//! polynomial approximation of the asymptotic distribution for the
//! constant-only case. Finite-sample critical values use the MacKinnon
//! response surface.

use crate::errors::{CausalImpactError, CausalResult};
use crate::linear_algebra::ols_fit;
use crate::math_utils::standard_normal_cdf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Minimum series length accepted by the test
pub const ADF_MIN_OBSERVATIONS: usize = 20;

/// Minimum rows in any candidate regression
const MIN_REGRESSION_ROWS: usize = 10;

/// Standard errors below this are treated as a degenerate regression
const SINGULAR_TOL: f64 = 1e-12;

// MacKinnon (1994) approximation, constant term, one variable
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Lag selection criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LagCriterion {
    /// Akaike information criterion
    AIC,
    /// Schwarz/Bayesian information criterion
    BIC,
}

/// ADF test configuration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdfConfig {
    /// Maximum lag order (None for the Schwert rule 12·(n/100)^¼)
    pub max_lag: Option<usize>,
    /// Lag selection criterion
    pub lag_criterion: LagCriterion,
}

impl Default for AdfConfig {
    fn default() -> Self {
        Self {
            max_lag: None,
            lag_criterion: LagCriterion::AIC,
        }
    }
}

/// Outcome of an ADF test
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdfTestResult {
    /// t statistic of β
    pub test_statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// (significance level, critical value) at 1%, 5% and 10%
    pub critical_values: Vec<(f64, f64)>,
    /// Lag order used
    pub lags_used: usize,
    /// Rows in the final regression
    pub n_observations: usize,
}

impl AdfTestResult {
    /// True when the unit root is rejected at level `alpha`
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// ADF test with the default configuration.
pub fn augmented_dickey_fuller(data: &[f64]) -> CausalResult<AdfTestResult> {
    augmented_dickey_fuller_with_config(data, &AdfConfig::default())
}

/// ADF test with explicit lag configuration.
pub fn augmented_dickey_fuller_with_config(
    data: &[f64],
    config: &AdfConfig,
) -> CausalResult<AdfTestResult> {
    let n = data.len();
    if n < ADF_MIN_OBSERVATIONS {
        return Err(CausalImpactError::InsufficientData {
            required: ADF_MIN_OBSERVATIONS,
            actual: n,
        });
    }
    crate::errors::validate_all_finite(data, "adf input")?;

    let diffs: Vec<f64> = data.windows(2).map(|w| w[1] - w[0]).collect();
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)) as usize;
    let max_lag = config
        .max_lag
        .unwrap_or(schwert)
        .min(n / 4)
        .min(diffs.len().saturating_sub(MIN_REGRESSION_ROWS));

    // Lag search over a common sample so criteria are comparable
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let Some(candidate) = adf_regression(data, &diffs, lag, max_lag)? else {
            continue;
        };
        let ic = match config.lag_criterion {
            LagCriterion::AIC => candidate.aic,
            LagCriterion::BIC => candidate.bic,
        };
        if best.map_or(true, |(_, b)| ic < b) {
            best = Some((lag, ic));
        }
    }

    let (lag, _) = best.ok_or_else(|| CausalImpactError::StatisticalTestError {
        test_name: "augmented Dickey-Fuller".to_string(),
    })?;
    let fit = adf_regression(data, &diffs, lag, lag)?.ok_or_else(|| {
        CausalImpactError::StatisticalTestError {
            test_name: "augmented Dickey-Fuller".to_string(),
        }
    })?;

    Ok(AdfTestResult {
        test_statistic: fit.t_stat,
        p_value: mackinnon_p_value(fit.t_stat)?,
        critical_values: adf_critical_values(n),
        lags_used: lag,
        n_observations: fit.rows,
    })
}

struct AdfRegression {
    t_stat: f64,
    aic: f64,
    bic: f64,
    rows: usize,
}

/// Fits the ADF regression with `lag` lagged differences, starting at `start`.
///
/// `Ok(None)` marks a degenerate configuration that the lag search skips.
fn adf_regression(
    data: &[f64],
    diffs: &[f64],
    lag: usize,
    start: usize,
) -> CausalResult<Option<AdfRegression>> {
    if diffs.len() < start + MIN_REGRESSION_ROWS {
        return Ok(None);
    }
    let rows = diffs.len() - start;

    // diffs[i] = data[i+1] - data[i], so y_{t-1} for diffs[i] is data[i]
    let mut x = vec![vec![1.0; rows], data[start..diffs.len()].to_vec()];
    for j in 1..=lag {
        x.push((start..diffs.len()).map(|i| diffs[i - j]).collect());
    }
    let y = &diffs[start..];
    let k = x.len();
    if rows <= k {
        return Ok(None);
    }

    let fit = match ols_fit(&x, y) {
        Ok(fit) => fit,
        Err(CausalImpactError::SingularMatrix { reason }) => {
            log::warn!("ADF lag {} skipped: {}", lag, reason);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let se_beta = match fit.standard_error(1) {
        Some(se) if se >= SINGULAR_TOL => se,
        _ => return Ok(None),
    };

    let n = rows as f64;
    let log_likelihood_term = n * (fit.residual_sum_of_squares / n).ln();
    Ok(Some(AdfRegression {
        t_stat: fit.coefficients[1] / se_beta,
        aic: log_likelihood_term + 2.0 * k as f64,
        bic: log_likelihood_term + k as f64 * n.ln(),
        rows,
    }))
}

/// MacKinnon (1994) approximate p-value for the constant-only ADF statistic.
pub fn mackinnon_p_value(t_stat: f64) -> CausalResult<f64> {
    if t_stat > TAU_MAX {
        return Ok(1.0);
    }
    if t_stat < TAU_MIN {
        return Ok(0.0);
    }
    let coefficients: &[f64] = if t_stat <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let poly = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * t_stat + c);
    standard_normal_cdf(poly)
}

/// 1%, 5% and 10% critical values from the MacKinnon response surface (constant case).
pub fn adf_critical_values(n: usize) -> Vec<(f64, f64)> {
    let n_inv = 1.0 / n as f64;
    let n_inv2 = n_inv * n_inv;
    vec![
        (0.01, -3.43035 - 6.5393 * n_inv - 16.786 * n_inv2),
        (0.05, -2.86154 - 2.8903 * n_inv - 4.234 * n_inv2),
        (0.10, -2.56677 - 1.5384 * n_inv - 2.809 * n_inv2),
    ]
}
