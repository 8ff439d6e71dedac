//! Linear algebra operations for counterfactual regression
//!
//! Ordinary least squares through a Householder QR decomposition of the design
//! matrix. The QR route avoids forming and inverting `XᵗX` directly. It still
//! yields `(XᵗX)⁻¹ = R⁻¹R⁻ᵀ` for prediction-interval variances.
//!
//! Predictors are passed column-wise, `x[predictor_idx][observation_idx]`.

use crate::errors::{CausalImpactError, CausalResult};
use nalgebra::{DMatrix, DVector};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Validates that a vector contains no NaN or Inf values
fn ensure_finite_vector(v: &[f64], operation: &str) -> CausalResult<()> {
    for (i, &val) in v.iter().enumerate() {
        if !val.is_finite() {
            return Err(CausalImpactError::NumericalError {
                reason: format!("Non-finite value ({}) at position [{}]", val, i),
                operation: Some(operation.to_string()),
            });
        }
    }
    Ok(())
}

/// Validates predictor columns against the response length and returns (n, k).
fn ensure_design_shape(x: &[Vec<f64>], n: usize, operation: &str) -> CausalResult<(usize, usize)> {
    if x.is_empty() {
        return Err(CausalImpactError::NumericalError {
            reason: "Zero-width design matrix (no predictors)".to_string(),
            operation: Some(operation.to_string()),
        });
    }
    for (j, col) in x.iter().enumerate() {
        if col.len() != n {
            return Err(CausalImpactError::DimensionMismatch {
                column: format!("predictor {}", j),
                expected: n,
                actual: col.len(),
            });
        }
        ensure_finite_vector(col, operation)?;
    }
    Ok((n, x.len()))
}

/// Result of an ordinary least squares fit
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OlsFit {
    /// Estimated coefficients β, one per predictor
    pub coefficients: Vec<f64>,
    /// Residuals y − Xβ over the fitting rows
    pub residuals: Vec<f64>,
    /// Residual sum of squares
    pub residual_sum_of_squares: f64,
    /// (XᵗX)⁻¹, k×k, row-major
    pub xtx_inverse: Vec<Vec<f64>>,
    /// Number of fitting observations
    pub n_observations: usize,
}

impl OlsFit {
    /// Residual degrees of freedom n − k
    pub fn degrees_of_freedom(&self) -> usize {
        self.n_observations.saturating_sub(self.coefficients.len())
    }

    /// Classical MSE estimator RSS / (n − k); `None` with zero degrees of freedom.
    pub fn residual_variance(&self) -> Option<f64> {
        match self.degrees_of_freedom() {
            0 => None,
            df => Some(self.residual_sum_of_squares / df as f64),
        }
    }

    /// Standard error of coefficient `j`: sqrt(σ² · [(XᵗX)⁻¹]_jj)
    pub fn standard_error(&self, j: usize) -> Option<f64> {
        let sigma2 = self.residual_variance()?;
        let diag = *self.xtx_inverse.get(j)?.get(j)?;
        Some((sigma2 * diag).max(0.0).sqrt())
    }
}

/// Least squares fit of `y` on the predictor columns `x`, without intercept.
///
/// Include a column of ones in `x` if an intercept is wanted.
///
/// # Errors
/// - `InsufficientData` when there are fewer observations than predictors
/// - `DimensionMismatch` when a predictor length differs from `y`
/// - `SingularMatrix` when the predictors are (numerically) collinear
/// - `NumericalError` for non-finite inputs
pub fn ols_fit(x: &[Vec<f64>], y: &[f64]) -> CausalResult<OlsFit> {
    ensure_finite_vector(y, "ols_fit")?;
    let (n, k) = ensure_design_shape(x, y.len(), "ols_fit")?;
    if n < k {
        return Err(CausalImpactError::InsufficientData {
            required: k,
            actual: n,
        });
    }

    let design = DMatrix::from_fn(n, k, |i, j| x[j][i]);
    let response = DVector::from_column_slice(y);

    // Adaptive tolerance: eps * max(n,k) * ||X||_F with a safety factor
    let rank_tol = 100.0 * f64::EPSILON * (n.max(k) as f64) * design.norm().max(1.0);

    let qr = design.clone().qr();
    let r = qr.r();
    if let Some(j) = (0..k).find(|&j| r[(j, j)].abs() < rank_tol) {
        return Err(CausalImpactError::SingularMatrix {
            reason: format!(
                "predictor {} is linearly dependent on the preceding predictors (|R[{},{}]| = {:.2e} below {:.2e})",
                j,
                j,
                j,
                r[(j, j)].abs(),
                rank_tol
            ),
        });
    }

    let qty = qr.q().transpose() * &response;
    let beta = r
        .solve_upper_triangular(&qty)
        .ok_or_else(|| CausalImpactError::SingularMatrix {
            reason: "back substitution failed on R".to_string(),
        })?;
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(k, k))
        .ok_or_else(|| CausalImpactError::SingularMatrix {
            reason: "R is not invertible".to_string(),
        })?;
    let xtx_inv = &r_inv * r_inv.transpose();

    let coefficients: Vec<f64> = beta.iter().copied().collect();
    ensure_finite_vector(&coefficients, "ols_fit")?;

    let residuals = compute_residuals(x, y, &coefficients);
    let residual_sum_of_squares = residuals.iter().map(|e| e * e).sum();

    Ok(OlsFit {
        coefficients,
        residuals,
        residual_sum_of_squares,
        xtx_inverse: (0..k)
            .map(|i| (0..k).map(|j| xtx_inv[(i, j)]).collect())
            .collect(),
        n_observations: n,
    })
}

/// Fitted values Xβ for every row of the predictor columns.
pub fn predict(x: &[Vec<f64>], coeffs: &[f64]) -> Vec<f64> {
    let n = x.first().map_or(0, |c| c.len());
    (0..n)
        .map(|i| x.iter().zip(coeffs).map(|(col, b)| col[i] * b).sum())
        .collect()
}

/// Residuals y − Xβ.
pub fn compute_residuals(x: &[Vec<f64>], y: &[f64], coeffs: &[f64]) -> Vec<f64> {
    predict(x, coeffs)
        .into_iter()
        .zip(y)
        .map(|(fitted, yi)| yi - fitted)
        .collect()
}

/// Quadratic form vᵗ·M·v for a square row-major matrix.
pub fn quadratic_form(matrix: &[Vec<f64>], v: &[f64]) -> f64 {
    matrix
        .iter()
        .zip(v)
        .map(|(row, vi)| vi * row.iter().zip(v).map(|(m, vj)| m * vj).sum::<f64>())
        .sum()
}
