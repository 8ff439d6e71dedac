//! # Analysis Configuration
//!
//! Configuration for the counterfactual estimator: the two-sided significance
//! level used for confidence bands and the verdict, and the tolerance used to
//! recognise noiseless fits.

use crate::errors::{validate_parameter, CausalResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default two-sided significance level (95% bands).
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Default relative tolerance below which the residual standard deviation is
/// treated as exactly zero.
pub const DEFAULT_ZERO_NOISE_TOLERANCE: f64 = 1e-9;

/// Configuration for a counterfactual impact run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImpactConfig {
    /// Two-sided significance level α; bands use z(1 − α/2)
    pub significance_level: f64,
    /// Residual standard deviation (relative to the pre-period target scale)
    /// below which a fit is considered noiseless
    pub zero_noise_tolerance: f64,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ImpactConfig {
    /// Standard configuration: 95% confidence
    pub fn standard() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            zero_noise_tolerance: DEFAULT_ZERO_NOISE_TOLERANCE,
        }
    }

    /// Strict configuration: 99% confidence
    pub fn strict() -> Self {
        Self {
            significance_level: 0.01,
            ..Self::standard()
        }
    }

    /// Exploratory configuration: 90% confidence
    pub fn exploratory() -> Self {
        Self {
            significance_level: 0.10,
            ..Self::standard()
        }
    }

    /// Returns a copy with a different significance level
    pub fn with_significance_level(mut self, alpha: f64) -> Self {
        self.significance_level = alpha;
        self
    }

    /// Returns a copy with a different zero-noise tolerance
    pub fn with_zero_noise_tolerance(mut self, tolerance: f64) -> Self {
        self.zero_noise_tolerance = tolerance;
        self
    }

    /// Confidence level implied by the significance level, e.g. 0.95
    pub fn confidence_level(&self) -> f64 {
        1.0 - self.significance_level
    }

    /// Checks that α lies strictly inside (0, 1) and the tolerance is non-negative.
    pub fn validate(&self) -> CausalResult<()> {
        validate_parameter(
            self.significance_level,
            f64::MIN_POSITIVE,
            1.0 - f64::EPSILON,
            "significance_level",
        )?;
        validate_parameter(
            self.zero_noise_tolerance,
            0.0,
            f64::MAX,
            "zero_noise_tolerance",
        )
    }
}
