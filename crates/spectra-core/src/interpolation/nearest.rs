//! Nearest-neighbour interpolation.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::bounds::{column, inside_mask};
use super::trait_::Interpolator;

/// Nearest-neighbour interpolator with zero fill outside the grid.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest-neighbour interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();
        let mask = inside_mask(&indices, [d0, d1, d2]);

        let x_i = column(&indices, 0).round().clamp(0.0, (d0 - 1) as f64).int();
        let y_i = column(&indices, 1).round().clamp(0.0, (d1 - 1) as f64).int();
        let z_i = column(&indices, 2).round().clamp(0.0, (d2 - 1) as f64).int();

        let stride_x = (d1 * d2) as i32;
        let stride_y = d2 as i32;

        let idx = x_i * stride_x + y_i * stride_y + z_i;
        let flat_data = data.clone().reshape([d0 * d1 * d2]);
        flat_data.gather(0, idx) * mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_rounding() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 1.0], [2.0, 3.0]], [[4.0, 5.0], [6.0, 7.0]]],
            &device,
        );
        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.2, 0.9, 0.1], [0.8, 0.1, 0.7], [1.0, 1.0, 1.0]],
            &device,
        );
        let values = NearestNeighborInterpolator::new().interpolate(&data, indices).into_data();
        assert_eq!(values.as_slice::<f32>().unwrap(), &[2.0, 5.0, 7.0]);
    }

    #[test]
    fn test_nearest_outside_is_zero() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::ones([2, 2, 2], &device);
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.0, 2.0, 0.0], [0.0, 0.0, -0.6]], &device);
        let values = NearestNeighborInterpolator::new().interpolate(&data, indices).into_data();
        assert_eq!(values.as_slice::<f32>().unwrap(), &[0.0, 0.0]);
    }
}
