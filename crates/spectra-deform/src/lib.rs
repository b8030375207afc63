//! Displacement-field algebra.
//!
//! Composition, approximate inversion, warping and Jacobian analysis of the
//! dense fields defined in `spectra_core`. Every operation takes its inputs by
//! reference and returns new values.

pub mod config;
pub mod compose;
pub mod invert;
pub mod warp;
pub mod jacobian;

pub use compose::{compose, FieldComposer};
pub use config::{
    InversionConfig, InversionMethod, JacobianConfig, JacobianConvention, WarpConfig,
};
pub use invert::{
    consistency_residual, invert, ConsistencyResidual, FieldInverter, InversionReport,
};
pub use jacobian::{jacobian_determinant, JacobianFilter, JacobianMap, JacobianSummary};
pub use spectra_core::{FieldError, Interpolation, Result};
pub use warp::{warp, FieldWarper};
