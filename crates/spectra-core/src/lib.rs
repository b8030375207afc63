//! Data model for displacement-field algebra on spectral volumes.
//!
//! Provides the spatial map of a voxel grid, scalar and spectral volumes,
//! dense displacement fields, and the zero-fill samplers shared by every
//! field operation.

pub mod error;
pub mod spatial;
pub mod image;
pub mod field;
pub mod interpolation;
pub mod host;

pub use error::{FieldError, Result};
pub use field::{validate_field_shape, DisplacementField};
pub use image::{Image, SpectralImage};
pub use interpolation::{Interpolation, Interpolator};
pub use spatial::{spacing_of, Direction, Point, Spacing, SpatialMap, Vector};
