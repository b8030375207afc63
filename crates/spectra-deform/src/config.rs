//! Configuration for the field operations.
//!
//! All settings are plain values with sensible defaults, serializable so they
//! can be embedded in a caller's own configuration.

use serde::{Deserialize, Serialize};
use spectra_core::{FieldError, Interpolation, Result};

/// Algorithm used to invert a displacement field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InversionMethod {
    /// Piecewise-linear interpolation over a tetrahedral mesh of the
    /// forward-mapped grid.
    #[default]
    Simplicial,
    /// Iterate `g ← −d(x + g)` with trilinear sampling.
    FixedPoint,
}

/// Inversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InversionConfig {
    /// Inversion algorithm.
    pub method: InversionMethod,
    /// Slack on barycentric coordinates when testing tetrahedron containment.
    pub barycentric_tolerance: f64,
    /// Bucket edge length of the cell index, in multiples of the largest
    /// voxel spacing.
    pub bucket_scale: f64,
    /// Maximum number of fixed-point iterations.
    pub iterations: usize,
    /// Fixed-point early exit: largest update, in voxels.
    pub tolerance: f64,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            method: InversionMethod::Simplicial,
            barycentric_tolerance: 1e-5,
            bucket_scale: 1.0,
            iterations: 20,
            tolerance: 1e-4,
        }
    }
}

impl InversionConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the inversion algorithm.
    pub fn with_method(mut self, method: InversionMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the barycentric containment tolerance.
    pub fn with_barycentric_tolerance(mut self, tolerance: f64) -> Self {
        self.barycentric_tolerance = tolerance;
        self
    }

    /// Set the bucket edge length relative to the voxel spacing.
    pub fn with_bucket_scale(mut self, scale: f64) -> Self {
        self.bucket_scale = scale;
        self
    }

    /// Set the fixed-point iteration budget and early-exit tolerance.
    pub fn with_fixed_point(mut self, iterations: usize, tolerance: f64) -> Self {
        self.iterations = iterations;
        self.tolerance = tolerance;
        self
    }

    /// Check that every setting is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.barycentric_tolerance.is_finite() && self.barycentric_tolerance >= 0.0) {
            return Err(FieldError::invalid_configuration(format!(
                "barycentric tolerance must be finite and non-negative, got {}",
                self.barycentric_tolerance
            )));
        }
        if !(self.bucket_scale.is_finite() && self.bucket_scale > 0.0) {
            return Err(FieldError::invalid_configuration(format!(
                "bucket scale must be positive, got {}",
                self.bucket_scale
            )));
        }
        if self.method == InversionMethod::FixedPoint {
            if self.iterations == 0 {
                return Err(FieldError::invalid_configuration(
                    "fixed-point inversion needs at least one iteration",
                ));
            }
            if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
                return Err(FieldError::invalid_configuration(format!(
                    "fixed-point tolerance must be finite and non-negative, got {}",
                    self.tolerance
                )));
            }
        }
        Ok(())
    }
}

/// Warping settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WarpConfig {
    /// Sampling mode for the source image.
    pub interpolation: Interpolation,
}

impl WarpConfig {
    /// Create a config with linear interpolation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interpolation mode.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Set the interpolation mode from a numeric order (0 or 1).
    pub fn with_order(self, order: u32) -> Result<Self> {
        Ok(self.with_interpolation(Interpolation::from_order(order)?))
    }
}

/// Finite-difference scheme for Jacobian determinants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JacobianConvention {
    /// Forward differences, output trimmed to `(X−1, Y−1, Z−1)`.
    #[default]
    ForwardTrimmed,
    /// Centred differences inside, one-sided at the edges, full-size output.
    CenteredGradient,
}

/// Jacobian analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JacobianConfig {
    /// Difference scheme.
    pub convention: JacobianConvention,
}

impl JacobianConfig {
    /// Create a config with the forward-trimmed convention.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the difference scheme.
    pub fn with_convention(mut self, convention: JacobianConvention) -> Self {
        self.convention = convention;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = InversionConfig::default();
        assert_eq!(config.method, InversionMethod::Simplicial);
        assert!(config.validate().is_ok());
        assert_eq!(WarpConfig::default().interpolation, Interpolation::Linear);
        assert_eq!(
            JacobianConfig::default().convention,
            JacobianConvention::ForwardTrimmed
        );
    }

    #[test]
    fn test_rejects_bad_inversion_settings() {
        let config = InversionConfig::new().with_bucket_scale(0.0);
        assert!(matches!(
            config.validate(),
            Err(FieldError::InvalidConfiguration(_))
        ));

        let config = InversionConfig::new()
            .with_method(InversionMethod::FixedPoint)
            .with_fixed_point(0, 1e-4);
        assert!(config.validate().is_err());

        // Iteration budget is irrelevant to the simplicial method.
        let config = InversionConfig::new().with_fixed_point(0, 1e-4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_warp_order() {
        let config = WarpConfig::new().with_order(0).unwrap();
        assert_eq!(config.interpolation, Interpolation::Nearest);
        assert!(WarpConfig::new().with_order(2).is_err());
    }
}
