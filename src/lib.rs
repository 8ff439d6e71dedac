//! # Causal Finance
//!
//! Counterfactual impact analysis for financial time series.
//!
//! Given a target series (a stock, a fund, a token) and one or more control
//! series that were not affected by some event, this crate fits an ordinary
//! least squares model of the target on the controls over a pre-event window,
//! projects that model over the post-event window and reports how far the
//! observed target departs from the projection.
//!
//! ## Key Features
//!
//! - **Date-aligned inputs**: [`merge_series`] inner-joins dated series and drops incomplete rows
//! - **QR-based OLS**: Householder QR with an explicit rank check, no normal-equation inversion
//! - **Forecast bands**: pointwise σ²(1 + xᵗ(XᵗX)⁻¹x) variance with normal-quantile bands
//! - **Significance test**: two-sided test of the cumulative effect
//! - **Pre-period diagnostics**: augmented Dickey-Fuller on levels and returns, return correlations
//! - **Report**: plain-text summary table and narrative built from the result alone
//!
//! ## Quick Start
//!
//! ```rust
//! use causal_finance::{estimate_impact, merge_series, ObservationSeries, Period};
//! use chrono::{Days, NaiveDate};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//!     let dates: Vec<NaiveDate> = (0..40).map(|i| start + Days::new(i)).collect();
//!
//!     let index: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 + ((i * 7) % 5) as f64).collect();
//!     // The target tracks the index until day 30, then jumps by 15
//!     let stock: Vec<f64> = index
//!         .iter()
//!         .enumerate()
//!         .map(|(i, x)| 0.5 * x + ((i * 11) % 3) as f64 * 0.1 + if i >= 30 { 15.0 } else { 0.0 })
//!         .collect();
//!
//!     let target = ObservationSeries::new("STOCK", dates.clone(), stock)?;
//!     let control = ObservationSeries::new("INDEX", dates.clone(), index)?;
//!     let table = merge_series(&target, &[control])?;
//!
//!     let pre = Period::new(dates[0], dates[29])?;
//!     let post = Period::new(dates[30], dates[39])?;
//!     let result = estimate_impact(&table, &pre, &post)?;
//!
//!     assert!(result.effect_detected);
//!     println!("{}", result.report());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! [`CounterfactualEstimator`] orchestrates the fit and the post-period
//! evaluation and returns an immutable [`ImpactResult`]. Rendering
//! ([`render_report`]) and diagnostics ([`run_pre_period_diagnostics`]) work
//! from the same inputs and outputs without touching the estimator's state.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod estimator;
pub mod linear_algebra;
pub mod math_utils;
pub mod report;
pub mod results;
pub mod series;
pub mod stationarity;

pub use config::ImpactConfig;
pub use diagnostics::{
    return_correlations, run_pre_period_diagnostics, CorrelationMatrix, PrePeriodDiagnostics,
    StationarityAssessment,
};
pub use errors::{CausalImpactError, CausalResult};
pub use estimator::{estimate_impact, CounterfactualEstimator, FittedModel};
pub use report::render_report;
pub use results::{ConfidenceBand, ImpactPlotSeries, ImpactResult, PeriodMetadata};
pub use series::{merge_series, MergedTable, ObservationSeries, Period, PeriodKind};
pub use stationarity::{
    augmented_dickey_fuller, augmented_dickey_fuller_with_config, AdfConfig, AdfTestResult,
    LagCriterion,
};
