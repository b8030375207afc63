use burn::tensor::{Shape, Tensor, TensorData};
use burn::tensor::backend::Backend;

/// Number of voxels in a 3D grid.
pub fn voxel_count(shape: [usize; 3]) -> usize {
    shape[0] * shape[1] * shape[2]
}

/// Flat row-major offset of voxel `(x, y, z)`; axis 0 varies slowest.
#[inline]
pub fn flat_index(shape: [usize; 3], x: usize, y: usize, z: usize) -> usize {
    (x * shape[1] + y) * shape[2] + z
}

/// Generate the regular voxel-coordinate grid for a volume.
///
/// Returns a tensor of shape `[N, 3]` whose row `n` holds `(x, y, z)` of the
/// voxel at flat offset `n`, matching the row-major layout of `[X, Y, Z]`
/// volumes and `[X, Y, Z, 3]` fields.
///
/// # Arguments
/// * `shape` - The grid extents `[X, Y, Z]`
/// * `device` - The device to create the tensor on
pub fn voxel_grid<B: Backend>(shape: [usize; 3], device: &B::Device) -> Tensor<B, 2> {
    let total = voxel_count(shape);

    let mut grid = Vec::with_capacity(total * 3);
    for x in 0..shape[0] {
        for y in 0..shape[1] {
            for z in 0..shape[2] {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * 3])), device)
        .reshape([total, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_grid_rows_follow_flat_index() {
        let device = Default::default();
        let shape = [2, 3, 4];
        let grid = voxel_grid::<TestBackend>(shape, &device);
        assert_eq!(grid.dims(), [24, 3]);

        let data = grid.into_data();
        let rows = data.as_slice::<f32>().unwrap();
        let n = flat_index(shape, 1, 2, 3);
        assert_eq!(n, 23);
        assert_eq!(&rows[n * 3..n * 3 + 3], &[1.0, 2.0, 3.0]);
        let n = flat_index(shape, 0, 1, 0);
        assert_eq!(&rows[n * 3..n * 3 + 3], &[0.0, 1.0, 0.0]);
    }
}
