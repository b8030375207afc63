//! Approximate inversion of displacement fields.
//!
//! For a field `d` the inverse `g` satisfies `p + d(p) + g(p + d(p)) ≈ p`.
//! There is no closed form for a sampled field, so the inverse is estimated
//! either by piecewise-linear interpolation over the forward-mapped grid
//! ([`InversionMethod::Simplicial`], the default) or by fixed-point iteration
//! ([`InversionMethod::FixedPoint`]).
//!
//! Grid points outside the forward-mapped domain have no preimage. They keep
//! a zero displacement and are counted in the [`InversionReport`] rather than
//! failing the inversion. Folds are not detected here; use
//! [`crate::jacobian`] for that.

mod fixed_point;
mod simplicial;


use burn::tensor::backend::Backend;
use spectra_core::host::{from_host, to_host};
use spectra_core::{DisplacementField, FieldError, Result};

use crate::compose::compose;
use crate::config::{InversionConfig, InversionMethod};
use fixed_point::invert_fixed_point;
use simplicial::SimplicialInverter;

/// Outcome of an inversion besides the inverse itself.
#[derive(Debug, Clone, PartialEq)]
pub struct InversionReport {
    /// Method that produced the inverse.
    pub method: InversionMethod,
    /// Number of grid points.
    pub voxels: usize,
    /// Grid points left at zero displacement because no preimage was found.
    pub unresolved: usize,
    /// Fixed-point iterations performed (zero for the simplicial method).
    pub iterations: usize,
    /// Largest update of the final fixed-point iteration, in voxels.
    pub last_update: Option<f64>,
}

impl InversionReport {
    /// Fraction of grid points without a preimage.
    pub fn unresolved_fraction(&self) -> f64 {
        if self.voxels == 0 {
            0.0
        } else {
            self.unresolved as f64 / self.voxels as f64
        }
    }

    /// True when every grid point found a preimage.
    pub fn is_complete(&self) -> bool {
        self.unresolved == 0
    }
}

/// Inverts displacement fields.
#[derive(Debug, Clone, Default)]
pub struct FieldInverter {
    config: InversionConfig,
}

impl FieldInverter {
    /// Create an inverter with the default simplicial method.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inverter with explicit settings.
    pub fn with_config(config: InversionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active settings.
    pub fn config(&self) -> &InversionConfig {
        &self.config
    }

    /// Invert `field`, discarding the report.
    pub fn invert<B: Backend>(&self, field: &DisplacementField<B>) -> Result<DisplacementField<B>> {
        self.invert_with_report(field).map(|(inverse, _)| inverse)
    }

    /// Invert `field`. The inverse lives on the same grid and carries the
    /// same spatial map.
    ///
    /// # Errors
    /// `GridTooSmall` when the simplicial method is selected and any extent is
    /// below 2, or when the grid is empty.
    pub fn invert_with_report<B: Backend>(
        &self,
        field: &DisplacementField<B>,
    ) -> Result<(DisplacementField<B>, InversionReport)> {
        field.validate()?;
        let shape = field.grid_shape();
        if field.is_empty() {
            return Err(FieldError::grid_too_small(&shape));
        }
        tracing::debug!(
            "Inverting field of shape {:?} with {:?}",
            field.shape(),
            self.config.method
        );

        let (inverse, report) = match self.config.method {
            InversionMethod::Simplicial => {
                if shape.iter().any(|&n| n < 2) {
                    return Err(FieldError::grid_too_small(&shape));
                }
                let inverter = SimplicialInverter {
                    barycentric_tolerance: self.config.barycentric_tolerance,
                    bucket_scale: self.config.bucket_scale,
                };
                let spacing = field.spacing().to_array();
                let displacement = to_host(field.data().clone())?;
                let result = inverter.invert(&displacement, shape, spacing);
                let data = from_host::<B, 4>(&result.values, field.shape(), &field.device());
                let report = InversionReport {
                    method: InversionMethod::Simplicial,
                    voxels: field.len(),
                    unresolved: result.unresolved,
                    iterations: 0,
                    last_update: None,
                };
                (DisplacementField::new(data, *field.map())?, report)
            }
            InversionMethod::FixedPoint => {
                let result =
                    invert_fixed_point(field, self.config.iterations, self.config.tolerance)?;
                let report = InversionReport {
                    method: InversionMethod::FixedPoint,
                    voxels: field.len(),
                    unresolved: result.unresolved,
                    iterations: result.iterations,
                    last_update: Some(result.last_update),
                };
                (DisplacementField::new(result.data, *field.map())?, report)
            }
        };

        if report.unresolved > 0 {
            tracing::warn!(
                "{} of {} grid points have no preimage ({:.2}%); their inverse displacement is zero",
                report.unresolved,
                report.voxels,
                100.0 * report.unresolved_fraction()
            );
        }
        tracing::info!("Inverted displacement field on grid {:?}", shape);
        Ok((inverse, report))
    }
}

/// Invert `field` with the default simplicial method.
pub fn invert<B: Backend>(field: &DisplacementField<B>) -> Result<DisplacementField<B>> {
    FieldInverter::new().invert(field)
}

/// Residual of composing a field with its estimated inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyResidual {
    /// Largest residual displacement, in voxels.
    pub max: f64,
    /// Mean residual displacement, in voxels.
    pub mean: f64,
}

/// Compose `forward` then `inverse` and measure how far the result is from
/// the identity.
pub fn consistency_residual<B: Backend>(
    forward: &DisplacementField<B>,
    inverse: &DisplacementField<B>,
) -> Result<ConsistencyResidual> {
    let residual = compose(forward, inverse)?;
    let magnitude = to_host(residual.magnitude())?;
    let max = magnitude.iter().cloned().fold(0.0, f64::max);
    let mean = if magnitude.is_empty() {
        0.0
    } else {
        magnitude.iter().sum::<f64>() / magnitude.len() as f64
    };
    tracing::debug!("Inverse consistency residual: max {:.4}, mean {:.4}", max, mean);
    Ok(ConsistencyResidual { max, mean })
}
