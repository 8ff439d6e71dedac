//! Error types and validation functions for counterfactual impact analysis.
//!
//! Every failure of the estimator is surfaced as a typed [`CausalImpactError`].
//! Nothing is silently coerced to NaN or zero; callers decide how to present
//! the failure.

use chrono::NaiveDate;
use thiserror::Error;

/// Error types for causal impact operations.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CausalImpactError {
    /// Too few observations to fit or test.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required observations
        required: usize,
        /// Observations actually available
        actual: usize,
    },

    /// A period boundary selects no rows of the table.
    #[error("Empty period: {period} [{start}, {end}] selects no observations")]
    EmptyPeriod {
        /// Which period was empty ("pre-period" or "post-period")
        period: String,
        /// Inclusive start of the period
        start: NaiveDate,
        /// Inclusive end of the period
        end: NaiveDate,
    },

    /// A column does not line up with the target.
    #[error("Dimension mismatch: column '{column}' has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Offending column name
        column: String,
        /// Length of the target column
        expected: usize,
        /// Length of the offending column
        actual: usize,
    },

    /// Control columns are collinear over the fitting window.
    #[error("Singular design matrix: {reason}")]
    SingularMatrix {
        /// What made the matrix singular
        reason: String,
    },

    /// Invalid parameter value.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Period boundaries are reversed or the periods overlap.
    #[error("Invalid period: {reason}")]
    InvalidPeriod {
        /// Description of the problem
        reason: String,
    },

    /// An observation series violates its ordering or finiteness invariants.
    #[error("Invalid series '{name}': {reason}")]
    InvalidSeries {
        /// Series name
        name: String,
        /// Description of the violation
        reason: String,
    },

    /// Numerical computation error.
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },

    /// A diagnostic statistical test could not be computed.
    #[error("Statistical test failed: {test_name} could not be computed")]
    StatisticalTestError {
        /// Name of the statistical test that failed
        test_name: String,
    },
}

/// Result type for causal impact operations.
pub type CausalResult<T> = Result<T, CausalImpactError>;

/// Validates that data has sufficient length for an operation.
///
/// # Example
/// ```rust
/// use causal_finance::errors::validate_data_length;
///
/// let data = vec![1.0, 2.0, 3.0];
/// assert!(validate_data_length(&data, 2).is_ok());
/// assert!(validate_data_length(&data, 5).is_err());
/// ```
pub fn validate_data_length(data: &[f64], min_required: usize) -> CausalResult<()> {
    if data.len() < min_required {
        Err(CausalImpactError::InsufficientData {
            required: min_required,
            actual: data.len(),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter is within `[min, max]`.
///
/// # Example
/// ```rust
/// use causal_finance::errors::validate_parameter;
///
/// assert!(validate_parameter(0.05, 0.0, 1.0, "significance_level").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "significance_level").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> CausalResult<()> {
    if value.is_nan() {
        return Err(CausalImpactError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(CausalImpactError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
            operation: None,
        });
    }

    if value < min || value > max {
        Err(CausalImpactError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that all values in a slice are finite.
///
/// Returns on the first non-finite value, naming its index.
///
/// # Example
/// ```rust
/// use causal_finance::errors::validate_all_finite;
///
/// assert!(validate_all_finite(&[1.0, 2.0], "closes").is_ok());
/// assert!(validate_all_finite(&[1.0, f64::NAN], "closes").is_err());
/// ```
pub fn validate_all_finite(data: &[f64], name: &str) -> CausalResult<()> {
    if let Some((i, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        let value_desc = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };

        return Err(CausalImpactError::NumericalError {
            reason: format!(
                "{} contains non-finite value at index {}: {}",
                name, i, value_desc
            ),
            operation: None,
        });
    }

    Ok(())
}
