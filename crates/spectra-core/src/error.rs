//! Error types for field and volume operations.
//!
//! Structural contract violations (wrong shapes, degenerate spatial maps,
//! unsupported settings) are reported through [`FieldError`]. Numerical edge
//! cases such as samples outside the grid or folds are never errors; they are
//! represented in the output data instead.

use thiserror::Error;

/// Error type for displacement-field algebra.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Two grids that must agree have different shapes.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A vector field does not have exactly three trailing components.
    #[error("Invalid field rank: expected [X, Y, Z, 3], got {shape:?}")]
    InvalidFieldRank { shape: Vec<usize> },

    /// The voxel-to-world affine cannot be used for spacing-aware algebra.
    #[error("Invalid spatial map: {0}")]
    InvalidSpatialMap(String),

    /// A finite-difference operation needs at least two samples per axis.
    #[error("Grid too small for finite differences: {shape:?}")]
    GridTooSmall { shape: Vec<usize> },

    /// A configuration value is outside its supported range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Tensor contents could not be read back into host memory.
    #[error("Tensor data error: {0}")]
    TensorData(String),
}

/// Result type for field operations.
pub type Result<T> = std::result::Result<T, FieldError>;

impl FieldError {
    /// Create a shape mismatch error from two shapes.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Create an invalid field rank error.
    pub fn invalid_field_rank(shape: &[usize]) -> Self {
        Self::InvalidFieldRank {
            shape: shape.to_vec(),
        }
    }

    /// Create an invalid spatial map error.
    pub fn invalid_spatial_map(msg: impl Into<String>) -> Self {
        Self::InvalidSpatialMap(msg.into())
    }

    /// Create a grid-too-small error.
    pub fn grid_too_small(shape: &[usize]) -> Self {
        Self::GridTooSmall {
            shape: shape.to_vec(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a tensor data error.
    pub fn tensor_data(msg: impl Into<String>) -> Self {
        Self::TensorData(msg.into())
    }
}
