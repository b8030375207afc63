//! Interpolation of volumes at continuous voxel coordinates.
//!
//! All samplers share one boundary policy (zero outside the grid, see
//! [`bounds`]), so every operation built on them agrees on edge semantics.

pub mod trait_;
pub mod bounds;
pub mod linear;
pub mod nearest;

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

pub use bounds::{inside_mask, BOUNDARY_TOLERANCE};
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use trait_::Interpolator;

/// Interpolation order selectable by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Order 0.
    Nearest,
    /// Order 1.
    #[default]
    Linear,
}

impl Interpolation {
    /// Map a numeric spline order to an interpolation mode.
    pub fn from_order(order: u32) -> Result<Self> {
        match order {
            0 => Ok(Self::Nearest),
            1 => Ok(Self::Linear),
            other => Err(FieldError::invalid_configuration(format!(
                "interpolation order must be 0 (nearest) or 1 (linear), got {}",
                other
            ))),
        }
    }

    /// Numeric spline order.
    pub fn order(&self) -> u32 {
        match self {
            Self::Nearest => 0,
            Self::Linear => 1,
        }
    }
}

impl<B: Backend> Interpolator<B> for Interpolation {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            Self::Nearest => NearestNeighborInterpolator.interpolate(data, indices),
            Self::Linear => LinearInterpolator.interpolate(data, indices),
        }
    }
}
