//! # Counterfactual Estimator
//!
//! Fits an ordinary least squares model of the target on the control columns
//! over the pre-period, extrapolates it over the post-period and measures the
//! gap between what happened and what the controls predict.
//!
//! ## Approximations
//!
//! Two simplifications apply:
//!
//! - Confidence bands use the normal quantile z(1 − α/2), not the Student t
//!   quantile with n − k degrees of freedom. Bands are therefore slightly too
//!   narrow for short pre-periods.
//! - The significance test treats `cumulative / (σ·√n_post)` as standard
//!   normal. It ignores parameter-estimation uncertainty and the correlation
//!   it induces between post-period forecast errors, so the p-value can
//!   understate or overstate the true uncertainty.
//!
//! ## Usage Example
//!
//! ```rust
//! use causal_finance::{CounterfactualEstimator, ImpactConfig, MergedTable, Period};
//! use chrono::{Days, NaiveDate};
//!
//! # fn main() -> Result<(), causal_finance::CausalImpactError> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..15).map(|i| start + Days::new(i)).collect();
//! let c1: Vec<f64> = (0..15).map(|i| 10.0 + i as f64).collect();
//! let c2: Vec<f64> = (0..15).map(|i| 5.0 + ((i * 3) % 7) as f64).collect();
//! let y: Vec<f64> = c1.iter().zip(&c2).map(|(a, b)| 2.0 * a - b).collect();
//!
//! let table = MergedTable::from_columns(
//!     dates.clone(),
//!     "TARGET",
//!     y,
//!     vec![("C1".to_string(), c1), ("C2".to_string(), c2)],
//! )?;
//! let pre = Period::new(dates[0], dates[9])?;
//! let post = Period::new(dates[10], dates[14])?;
//!
//! let result = CounterfactualEstimator::new(ImpactConfig::default())?.estimate(&table, &pre, &post)?;
//! assert!(result.cumulative_impact.abs() < 1e-8);
//! assert!(!result.effect_detected);
//! println!("{}", result.report());
//! # Ok(())
//! # }
//! ```

use crate::{
    config::ImpactConfig,
    errors::{CausalImpactError, CausalResult},
    linear_algebra::{ols_fit, predict, quadratic_form},
    math_utils::{mean, two_sided_critical_value, two_sided_p_value},
    report::render_report,
    results::{ConfidenceBand, ImpactResult, PeriodMetadata},
    series::{MergedTable, Period, PeriodKind},
};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pre-period regression of the target on the controls
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittedModel {
    /// Control names, aligned with `coefficients`
    pub control_names: Vec<String>,
    /// OLS coefficients β
    pub coefficients: Vec<f64>,
    /// σ² = RSS / (n − k)
    pub residual_variance: f64,
    /// (X_preᵗX_pre)⁻¹, row-major
    pub xtx_inverse: Vec<Vec<f64>>,
    /// Pre-period rows used for fitting
    pub n_observations: usize,
    /// n − k
    pub degrees_of_freedom: usize,
}

impl FittedModel {
    /// Residual standard deviation σ
    pub fn residual_std(&self) -> f64 {
        self.residual_variance.sqrt()
    }

    /// Coefficient of the named control
    pub fn coefficient(&self, control: &str) -> Option<f64> {
        self.control_names
            .iter()
            .position(|n| n == control)
            .map(|j| self.coefficients[j])
    }

    /// Prediction xᵗβ for one row of control values
    pub fn predict_row(&self, x: &[f64]) -> f64 {
        x.iter().zip(&self.coefficients).map(|(a, b)| a * b).sum()
    }

    /// Prediction-interval variance σ²·(1 + xᵗ(XᵗX)⁻¹x) for one row
    pub fn forecast_variance(&self, x: &[f64]) -> f64 {
        self.residual_variance * (1.0 + quadratic_form(&self.xtx_inverse, x))
    }
}

/// Counterfactual (causal impact) estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterfactualEstimator {
    config: ImpactConfig,
}

impl CounterfactualEstimator {
    /// Creates an estimator after validating the configuration.
    pub fn new(config: ImpactConfig) -> CausalResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Fits the pre-period regression only.
    pub fn fit(&self, table: &MergedTable, pre_period: &Period) -> CausalResult<FittedModel> {
        table.check_alignment()?;
        let pre_rows = select_rows(table, pre_period, PeriodKind::Pre)?;
        fit_rows(table, pre_rows)
    }

    /// Runs the full analysis: fit, counterfactual, bands, impact and significance.
    ///
    /// # Errors
    /// - `DimensionMismatch` if a control column is misaligned with the target
    /// - `InvalidPeriod` if the pre-period does not end before the post-period
    /// - `EmptyPeriod` if either period selects no rows
    /// - `InsufficientData` if the pre-period has no more rows than controls
    /// - `SingularMatrix` if the controls are collinear over the pre-period
    pub fn estimate(
        &self,
        table: &MergedTable,
        pre_period: &Period,
        post_period: &Period,
    ) -> CausalResult<ImpactResult> {
        table.check_alignment()?;
        pre_period.ensure_precedes(post_period)?;
        let pre_rows = select_rows(table, pre_period, PeriodKind::Pre)?;
        let post_rows = select_rows(table, post_period, PeriodKind::Post)?;

        let model = fit_rows(table, pre_rows.clone())?;
        let predicted = predict(table.controls(), &model.coefficients);
        let critical = two_sided_critical_value(self.config.significance_level)?;

        let actual = table.target();
        let n_post = post_rows.len();
        let mut forecast_variance = Vec::with_capacity(n_post);
        let mut confidence_bands = Vec::with_capacity(n_post);
        let mut pointwise_impact = Vec::with_capacity(n_post);
        let mut cumulative_impact_series = Vec::with_capacity(n_post);
        let mut running = 0.0;
        let mut row = vec![0.0; table.n_controls()];

        for i in post_rows.clone() {
            for (slot, column) in row.iter_mut().zip(table.controls()) {
                *slot = column[i];
            }
            let variance = model.forecast_variance(&row);
            let half_width = critical * variance.max(0.0).sqrt();
            forecast_variance.push(variance);
            confidence_bands.push(ConfidenceBand {
                lower: predicted[i] - half_width,
                upper: predicted[i] + half_width,
            });

            let impact = actual[i] - predicted[i];
            running += impact;
            pointwise_impact.push(impact);
            cumulative_impact_series.push(running);
        }

        let cumulative_impact = running;
        let post_predicted = &predicted[post_rows.clone()];
        let post_actual = &actual[post_rows.clone()];
        let sum_predicted: f64 = post_predicted.iter().sum();
        let relative_effect = relative_effect(cumulative_impact, post_predicted, sum_predicted);
        let mean_actual = mean(post_actual);
        let mean_predicted = mean(post_predicted);

        let scale = actual[pre_rows.clone()]
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        let tolerance = self.noise_tolerance(scale);
        let sigma = model.residual_std();
        let z = self.z_statistic(cumulative_impact, sigma, n_post, tolerance);
        let p_value = two_sided_p_value(z)?;

        // Same threshold as the z-test: the band excludes Σy exactly when p < α
        let cumulative_half_width = if sigma <= tolerance {
            tolerance * n_post as f64
        } else {
            critical * sigma * (n_post as f64).sqrt()
        };
        let cumulative_band = ConfidenceBand {
            lower: sum_predicted - cumulative_half_width,
            upper: sum_predicted + cumulative_half_width,
        };
        let average_band = ConfidenceBand {
            lower: cumulative_band.lower / n_post as f64,
            upper: cumulative_band.upper / n_post as f64,
        };

        log::debug!(
            "counterfactual fit for '{}': n_pre={}, n_post={}, sigma={:.4e}, cumulative={:.4}, p={:.4}",
            table.target_name(),
            pre_rows.len(),
            n_post,
            model.residual_std(),
            cumulative_impact,
            p_value
        );

        let mut result = ImpactResult {
            metadata: PeriodMetadata {
                target_name: table.target_name().to_string(),
                control_names: table.control_names().to_vec(),
                pre_period: *pre_period,
                post_period: *post_period,
                pre_rows,
                post_rows,
            },
            model,
            significance_level: self.config.significance_level,
            timestamps: table.timestamps().to_vec(),
            actual: actual.to_vec(),
            predicted,
            forecast_variance,
            confidence_bands,
            pointwise_impact,
            cumulative_impact_series,
            cumulative_impact,
            relative_effect,
            mean_actual,
            mean_predicted,
            cumulative_band,
            average_band,
            z_statistic: z.is_finite().then_some(z),
            p_value,
            effect_detected: p_value < self.config.significance_level,
            report: String::new(),
        };
        result.report = render_report(&result);
        Ok(result)
    }

    /// Noise floor `zero_noise_tolerance · max|y_pre|` (scale 1 for an all-zero target).
    fn noise_tolerance(&self, scale: f64) -> f64 {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        self.config.zero_noise_tolerance * scale
    }

    /// z = cumulative / (σ·√n_post), with noiseless fits resolved explicitly.
    ///
    /// When σ is below `tolerance`, the ratio is 0/0 or x/0 in exact
    /// arithmetic: z is 0 if the cumulative impact is also below tolerance and
    /// ±∞ otherwise.
    fn z_statistic(&self, cumulative: f64, sigma: f64, n_post: usize, tolerance: f64) -> f64 {
        if sigma <= tolerance {
            log::warn!(
                "residual standard deviation {:.3e} is below tolerance {:.3e}; treating the fit as noiseless",
                sigma,
                tolerance
            );
            if cumulative.abs() <= tolerance * n_post as f64 {
                0.0
            } else {
                cumulative.signum() * f64::INFINITY
            }
        } else {
            cumulative / (sigma * (n_post as f64).sqrt())
        }
    }
}

/// Runs [`CounterfactualEstimator::estimate`] with the default configuration.
pub fn estimate_impact(
    table: &MergedTable,
    pre_period: &Period,
    post_period: &Period,
) -> CausalResult<ImpactResult> {
    CounterfactualEstimator::default().estimate(table, pre_period, post_period)
}

fn select_rows(table: &MergedTable, period: &Period, kind: PeriodKind) -> CausalResult<Range<usize>> {
    let rows = table.select(period);
    if rows.is_empty() {
        return Err(CausalImpactError::EmptyPeriod {
            period: kind.to_string(),
            start: period.start(),
            end: period.end(),
        });
    }
    Ok(rows)
}

fn fit_rows(table: &MergedTable, rows: Range<usize>) -> CausalResult<FittedModel> {
    let k = table.n_controls();
    // n == k leaves zero residual degrees of freedom for σ²
    if rows.len() <= k {
        return Err(CausalImpactError::InsufficientData {
            required: k + 1,
            actual: rows.len(),
        });
    }

    let x_pre: Vec<Vec<f64>> = table
        .controls()
        .iter()
        .map(|c| c[rows.clone()].to_vec())
        .collect();
    let y_pre = &table.target()[rows];
    let fit = ols_fit(&x_pre, y_pre)?;

    let degrees_of_freedom = fit.degrees_of_freedom();
    let residual_variance = fit
        .residual_variance()
        .ok_or_else(|| CausalImpactError::InsufficientData {
            required: k + 1,
            actual: fit.n_observations,
        })?;

    Ok(FittedModel {
        control_names: table.control_names().to_vec(),
        coefficients: fit.coefficients,
        residual_variance,
        xtx_inverse: fit.xtx_inverse,
        n_observations: fit.n_observations,
        degrees_of_freedom,
    })
}

/// `None` when the post-period predictions sum to (numerically) zero.
fn relative_effect(cumulative: f64, post_predicted: &[f64], sum_predicted: f64) -> Option<f64> {
    let magnitude: f64 = post_predicted.iter().map(|v| v.abs()).sum();
    if sum_predicted.abs() <= f64::EPSILON * magnitude {
        log::warn!("post-period predictions sum to zero; relative effect is undefined");
        None
    } else {
        Some(cumulative / sum_predicted)
    }
}
