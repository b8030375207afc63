//! Interpolator trait for sampling volumes at continuous voxel coordinates.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples a `[X, Y, Z]` volume at continuous voxel coordinates.
///
/// Every implementation follows the same boundary policy: a coordinate
/// outside `[0, n - 1]` on any axis (beyond [`super::BOUNDARY_TOLERANCE`])
/// evaluates to zero. Composition, inversion and warping all sample through
/// this trait, so they agree on what happens at the edge of the grid.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a volume at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source volume `[X, Y, Z]`
    /// * `indices` - Continuous voxel coordinates `[Batch, 3]` in `(x, y, z)` order
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1>;

    /// Interpolate every component of a `[X, Y, Z, C]` volume at the same
    /// coordinates, returning `[Batch, C]`.
    fn interpolate_channels(&self, data: &Tensor<B, 4>, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let channels = data.dims()[3];
        let sampled = (0..channels)
            .map(|c| {
                let volume = data.clone().narrow(3, c, 1).squeeze::<3>(3);
                self.interpolate(&volume, indices.clone())
            })
            .collect();
        Tensor::stack::<2>(sampled, 1)
    }
}
