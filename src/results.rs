//! # Impact Results Structures
//!
//! Read-only outputs of one counterfactual analysis run. An [`ImpactResult`]
//! is computed once by the estimator, carries its own period metadata and
//! report text, and is never mutated afterwards.

use crate::estimator::FittedModel;
use crate::series::Period;
use chrono::NaiveDate;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Two-sided interval around a counterfactual prediction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfidenceBand {
    /// Lower bound
    pub lower: f64,
    /// Upper bound
    pub upper: f64,
}

impl ConfidenceBand {
    /// Upper minus lower bound
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// True when `value` lies inside the band (inclusive)
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Description of the analysis windows and columns a result refers to
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeriodMetadata {
    /// Target column name
    pub target_name: String,
    /// Control column names
    pub control_names: Vec<String>,
    /// Training window
    pub pre_period: Period,
    /// Evaluation window
    pub post_period: Period,
    /// Row range of the pre-period in the merged table
    pub pre_rows: Range<usize>,
    /// Row range of the post-period in the merged table
    pub post_rows: Range<usize>,
}

impl PeriodMetadata {
    /// Observations used for fitting
    pub fn pre_observations(&self) -> usize {
        self.pre_rows.len()
    }

    /// Observations evaluated
    pub fn post_observations(&self) -> usize {
        self.post_rows.len()
    }
}

/// Complete output of a counterfactual impact analysis.
///
/// Series named `post_*` or indexed per post-period row are aligned with
/// `metadata.post_rows`; `timestamps`, `actual` and `predicted` cover the whole
/// merged table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpactResult {
    /// Windows and column names
    pub metadata: PeriodMetadata,
    /// Pre-period regression
    pub model: FittedModel,
    /// Two-sided significance level α used for bands and the verdict
    pub significance_level: f64,
    /// Dates of every row of the merged table
    pub timestamps: Vec<NaiveDate>,
    /// Observed target for every row
    pub actual: Vec<f64>,
    /// Counterfactual prediction X·β for every row
    pub predicted: Vec<f64>,
    /// Forecast variance per post-period row
    pub forecast_variance: Vec<f64>,
    /// Confidence band per post-period row
    pub confidence_bands: Vec<ConfidenceBand>,
    /// Band around Σ predictions: ± z·σ·√n_post, the same threshold as the test
    pub cumulative_band: ConfidenceBand,
    /// `cumulative_band` divided by the number of post-period rows
    pub average_band: ConfidenceBand,
    /// actual − predicted per post-period row
    pub pointwise_impact: Vec<f64>,
    /// Running sum of the pointwise impact over the post-period
    pub cumulative_impact_series: Vec<f64>,
    /// Sum of the pointwise impact over the post-period
    pub cumulative_impact: f64,
    /// Cumulative impact ÷ sum of post-period predictions; `None` when that sum is zero
    pub relative_effect: Option<f64>,
    /// Mean observed target over the post-period
    pub mean_actual: f64,
    /// Mean prediction over the post-period
    pub mean_predicted: f64,
    /// cumulative / (σ·√n_post), normal approximation.
    ///
    /// `None` for a noiseless fit with a non-zero cumulative impact, where the
    /// ratio is unbounded and `p_value` is 0.
    pub z_statistic: Option<f64>,
    /// Two-sided p-value of `z_statistic`
    pub p_value: f64,
    /// `p_value < significance_level`
    pub effect_detected: bool,
    /// Human-readable report
    pub report: String,
}

/// Borrowed view of the three series a chart needs.
#[derive(Debug, Clone, Copy)]
pub struct ImpactPlotSeries<'a> {
    /// Dates of every row
    pub timestamps: &'a [NaiveDate],
    /// Observed target for every row
    pub observed: &'a [f64],
    /// Counterfactual for every row
    pub predicted: &'a [f64],
    /// Dates of the post-period rows
    pub post_timestamps: &'a [NaiveDate],
    /// Band to shade over the post-period
    pub confidence_bands: &'a [ConfidenceBand],
    /// First post-period date, where the vertical marker goes
    pub intervention: NaiveDate,
    /// Pointwise impact over the post-period
    pub pointwise_impact: &'a [f64],
    /// Cumulative impact over the post-period
    pub cumulative_impact: &'a [f64],
}

impl ImpactResult {
    /// Observed target over the post-period
    pub fn post_actual(&self) -> &[f64] {
        &self.actual[self.metadata.post_rows.clone()]
    }

    /// Prediction over the post-period
    pub fn post_predicted(&self) -> &[f64] {
        &self.predicted[self.metadata.post_rows.clone()]
    }

    /// Dates of the post-period rows
    pub fn post_timestamps(&self) -> &[NaiveDate] {
        &self.timestamps[self.metadata.post_rows.clone()]
    }

    /// Sum of the observed target over the post-period
    pub fn sum_actual(&self) -> f64 {
        self.post_actual().iter().sum()
    }

    /// Sum of predictions over the post-period
    pub fn sum_predicted(&self) -> f64 {
        self.post_predicted().iter().sum()
    }

    /// Mean pointwise impact over the post-period
    pub fn average_effect(&self) -> f64 {
        self.mean_actual - self.mean_predicted
    }

    /// Confidence level, e.g. 0.95
    pub fn confidence_level(&self) -> f64 {
        1.0 - self.significance_level
    }

    /// True when the observed post-period sum lies inside `cumulative_band`
    pub fn cumulative_band_contains_actual(&self) -> bool {
        self.cumulative_band.contains(self.sum_actual())
    }

    /// Series needed to draw observed-vs-predicted, pointwise and cumulative panels.
    pub fn plot_series(&self) -> ImpactPlotSeries<'_> {
        let post_timestamps = self.post_timestamps();
        ImpactPlotSeries {
            timestamps: &self.timestamps,
            observed: &self.actual,
            predicted: &self.predicted,
            post_timestamps,
            confidence_bands: &self.confidence_bands,
            intervention: post_timestamps
                .first()
                .copied()
                .unwrap_or_else(|| self.metadata.post_period.start()),
            pointwise_impact: &self.pointwise_impact,
            cumulative_impact: &self.cumulative_impact_series,
        }
    }

    /// Report text
    pub fn report(&self) -> &str {
        &self.report
    }
}
