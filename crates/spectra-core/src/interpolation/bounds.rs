//! Zero-fill boundary policy shared by all samplers.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Slack, in voxels, allowed past the first and last sample before a
/// coordinate counts as outside the grid. Absorbs round-off from
/// world ↔ voxel conversions of coordinates that sit exactly on the edge.
pub const BOUNDARY_TOLERANCE: f64 = 1e-3;

/// One column of a `[Batch, 3]` coordinate table.
pub(crate) fn column<B: Backend>(indices: &Tensor<B, 2>, axis: usize) -> Tensor<B, 1> {
    indices.clone().narrow(1, axis, 1).squeeze::<1>(1)
}

/// Float mask `[Batch]`: 1 where the coordinate lies inside the grid on every
/// axis, 0 elsewhere.
pub fn inside_mask<B: Backend>(indices: &Tensor<B, 2>, dims: [usize; 3]) -> Tensor<B, 1> {
    let mut mask: Option<Tensor<B, 1>> = None;
    for (axis, &extent) in dims.iter().enumerate() {
        let c = column(indices, axis);
        let upper = (extent as f64 - 1.0) + BOUNDARY_TOLERANCE;
        let axis_mask = c.clone().greater_equal_elem(-BOUNDARY_TOLERANCE).float()
            * c.lower_equal_elem(upper).float();
        mask = Some(match mask {
            Some(m) => m * axis_mask,
            None => axis_mask,
        });
    }
    mask.unwrap_or_else(|| Tensor::ones([indices.dims()[0]], &indices.device()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mask_edges() {
        let device = Default::default();
        let indices = Tensor::<TestBackend, 2>::from_floats(
            [
                [0.0, 0.0, 0.0],
                [4.0, 4.0, 4.0],
                [4.0005, 0.0, 0.0],
                [-0.5, 1.0, 1.0],
                [1.0, 4.2, 1.0],
            ],
            &device,
        );
        let mask = inside_mask(&indices, [5, 5, 5]);
        let data = mask.into_data();
        assert_eq!(data.as_slice::<f32>().unwrap(), &[1.0, 1.0, 1.0, 0.0, 0.0]);
    }
}
