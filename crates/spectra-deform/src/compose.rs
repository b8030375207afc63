//! Composition of two displacement fields.
//!
//! Applying `first` and then `second` moves voxel `p` of the first grid to
//! the world point `y = (p + d₁(p))·s₁`, and then on by `d₂` sampled at the
//! continuous index `y / s₂` of the second grid. The composed field is
//! expressed back in the first grid's voxel units.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use spectra_core::field::spacing_tensor;
use spectra_core::image::voxel_grid;
use spectra_core::interpolation::{Interpolator, LinearInterpolator};
use spectra_core::{DisplacementField, FieldError, Result};

/// Composes two displacement fields defined on grids of equal shape.
///
/// The first field is applied first. The result carries the first field's
/// spatial map. Samples of the second field that fall outside its grid
/// contribute zero displacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldComposer {
    interpolator: LinearInterpolator,
}

impl FieldComposer {
    /// Create a composer with trilinear sampling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose `first` followed by `second`.
    ///
    /// # Errors
    /// `ShapeMismatch` when the two fields do not share a shape.
    pub fn compose<B: Backend>(
        &self,
        first: &DisplacementField<B>,
        second: &DisplacementField<B>,
    ) -> Result<DisplacementField<B>> {
        first.validate()?;
        second.validate()?;
        if first.shape() != second.shape() {
            return Err(FieldError::shape_mismatch(&first.shape(), &second.shape()));
        }

        let device = first.device();
        let [x, y, z] = first.grid_shape();
        tracing::debug!(
            "Composing fields of shape {:?} (spacing {:?} then {:?})",
            first.shape(),
            first.spacing().to_array(),
            second.spacing().to_array()
        );

        let s1 = spacing_tensor::<B>(&first.spacing(), &device).reshape([1, 3]);
        let s2 = spacing_tensor::<B>(&second.spacing(), &device).reshape([1, 3]);

        let grid = voxel_grid::<B>([x, y, z], &device);
        let first_world = first.vectors() * s1.clone();
        let mapped_world = grid * s1.clone() + first_world.clone();
        let second_indices = mapped_world / s2.clone();

        let sampled = self
            .interpolator
            .interpolate_channels(second.data(), second_indices);
        let composed_world: Tensor<B, 2> = first_world + sampled * s2;
        let composed = (composed_world / s1).reshape([x, y, z, 3]);

        tracing::info!("Composed displacement fields on grid {:?}", [x, y, z]);
        DisplacementField::new(composed, *first.map())
    }
}

/// Compose `first` followed by `second` with the default composer.
pub fn compose<B: Backend>(
    first: &DisplacementField<B>,
    second: &DisplacementField<B>,
) -> Result<DisplacementField<B>> {
    FieldComposer::new().compose(first, second)
}
