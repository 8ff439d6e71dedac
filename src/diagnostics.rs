//! # Pre-period Diagnostics
//!
//! Checks worth looking at before trusting a counterfactual fit: whether the
//! target is stationary over the training window (in levels and in simple
//! returns) and how strongly the returns of the target and controls move
//! together.
//!
//! ```rust
//! use causal_finance::diagnostics::run_pre_period_diagnostics;
//! use causal_finance::{AdfConfig, MergedTable, Period};
//! use chrono::{Days, NaiveDate};
//!
//! # fn main() -> Result<(), causal_finance::CausalImpactError> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..80).map(|i| start + Days::new(i)).collect();
//! let control: Vec<f64> = (0..80).map(|i| 100.0 + ((i * 53) % 29) as f64 * 0.2).collect();
//! let target: Vec<f64> = control
//!     .iter()
//!     .enumerate()
//!     .map(|(i, c)| 2.0 * c + ((i * 37) % 17) as f64 * 0.1)
//!     .collect();
//!
//! let table = MergedTable::from_columns(dates.clone(), "fund", target, vec![("index".to_string(), control)])?;
//! let pre = Period::new(dates[0], dates[59])?;
//! let report = run_pre_period_diagnostics(&table, &pre, &AdfConfig::default())?;
//! assert_eq!(report.return_correlations.names.len(), 2);
//! # Ok(())
//! # }
//! ```

use crate::errors::{CausalImpactError, CausalResult};
use crate::math_utils::{pct_change, pearson_correlation};
use crate::series::{MergedTable, Period, PeriodKind};
use crate::stationarity::{augmented_dickey_fuller_with_config, AdfConfig, AdfTestResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pairwise Pearson correlations, target first then controls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorrelationMatrix {
    /// Column names in matrix order
    pub names: Vec<String>,
    /// `values[i][j]`; `None` where a column has zero variance
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        self.values[i][j]
    }
}

/// Stationarity verdicts at a given significance level
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationarityAssessment {
    /// Level used for both verdicts
    pub significance_level: f64,
    /// Unit root rejected for the levels
    pub levels_stationary: bool,
    /// Unit root rejected for the returns
    pub returns_stationary: bool,
    /// One-line summary
    pub conclusion: String,
}

/// Diagnostics computed over the pre-period rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrePeriodDiagnostics {
    /// Target column name
    pub target_name: String,
    /// Rows of the pre-period
    pub n_observations: usize,
    /// ADF on the target levels
    pub levels_adf: AdfTestResult,
    /// ADF on the target's simple returns
    pub returns_adf: AdfTestResult,
    /// Correlations of simple returns across target and controls
    pub return_correlations: CorrelationMatrix,
}

impl PrePeriodDiagnostics {
    /// Verdicts at level `alpha`.
    pub fn assess(&self, alpha: f64) -> StationarityAssessment {
        let levels_stationary = self.levels_adf.is_stationary(alpha);
        let returns_stationary = self.returns_adf.is_stationary(alpha);

        let conclusion = match (levels_stationary, returns_stationary) {
            (true, _) => format!("{} is stationary in levels", self.target_name),
            (false, true) => format!(
                "{} has a unit root in levels but stationary returns",
                self.target_name
            ),
            (false, false) => format!(
                "{} shows no evidence of stationarity in levels or returns",
                self.target_name
            ),
        };

        StationarityAssessment {
            significance_level: alpha,
            levels_stationary,
            returns_stationary,
            conclusion,
        }
    }
}

/// Runs ADF on levels and returns and builds the return correlation matrix.
pub fn run_pre_period_diagnostics(
    table: &MergedTable,
    pre: &Period,
    adf_config: &AdfConfig,
) -> CausalResult<PrePeriodDiagnostics> {
    table.check_alignment()?;
    let rows = table.select(pre);
    if rows.is_empty() {
        return Err(CausalImpactError::EmptyPeriod {
            period: PeriodKind::Pre.to_string(),
            start: pre.start(),
            end: pre.end(),
        });
    }
    let window = table.slice(rows);

    let levels_adf = augmented_dickey_fuller_with_config(window.target(), adf_config)?;

    let target_returns: Vec<f64> = pct_change(window.target())
        .into_iter()
        .filter(|r| r.is_finite())
        .collect();
    let returns_adf = augmented_dickey_fuller_with_config(&target_returns, adf_config)?;

    let return_correlations = return_correlations(&window)?;

    log::debug!(
        "Pre-period diagnostics for {}: levels t = {:.3}, returns t = {:.3}",
        window.target_name(),
        levels_adf.test_statistic,
        returns_adf.test_statistic
    );

    Ok(PrePeriodDiagnostics {
        target_name: window.target_name().to_string(),
        n_observations: window.len(),
        levels_adf,
        returns_adf,
        return_correlations,
    })
}

/// Correlation matrix of simple returns over every row of `table`.
///
/// Rows where any column's return is non-finite (a zero previous price) are
/// dropped from every column so the samples stay paired.
pub fn return_correlations(table: &MergedTable) -> CausalResult<CorrelationMatrix> {
    let mut names = vec![table.target_name().to_string()];
    names.extend(table.control_names().iter().cloned());

    let raw: Vec<Vec<f64>> = std::iter::once(table.target())
        .chain(table.controls().iter().map(Vec::as_slice))
        .map(pct_change)
        .collect();

    let n_returns = table.len().saturating_sub(1);
    let keep: Vec<usize> = (0..n_returns)
        .filter(|&i| raw.iter().all(|col| col[i].is_finite()))
        .collect();
    if keep.len() < n_returns {
        log::warn!(
            "Dropped {} non-finite return rows before correlation",
            n_returns - keep.len()
        );
    }
    if keep.len() < 2 {
        return Err(CausalImpactError::InsufficientData {
            required: 2,
            actual: keep.len(),
        });
    }

    let columns: Vec<Vec<f64>> = raw
        .iter()
        .map(|col| keep.iter().map(|&i| col[i]).collect())
        .collect();

    let k = columns.len();
    let mut values = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson_correlation(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { names, values })
}
