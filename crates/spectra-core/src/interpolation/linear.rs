//! Trilinear interpolation.

use burn::tensor::{Int, Tensor};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::bounds::{column, inside_mask};
use super::trait_::Interpolator;

/// Trilinear interpolator with zero fill outside the grid.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn gather<B: Backend>(
        flat_data: &Tensor<B, 1>,
        xi: &Tensor<B, 1, Int>,
        yi: &Tensor<B, 1, Int>,
        zi: &Tensor<B, 1, Int>,
        stride_x: i32,
        stride_y: i32,
    ) -> Tensor<B, 1> {
        let idx = xi.clone() * stride_x + yi.clone() * stride_y + zi.clone();
        flat_data.clone().gather(0, idx)
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate(&self, data: &Tensor<B, 3>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let [d0, d1, d2] = data.dims();
        let batch_size = indices.dims()[0];
        let device = indices.device();
        let mask = inside_mask(&indices, [d0, d1, d2]);

        let x = column(&indices, 0);
        let y = column(&indices, 1);
        let z = column(&indices, 2);

        let x0 = x.clone().floor();
        let y0 = y.clone().floor();
        let z0 = z.clone().floor();

        let wx = x - x0.clone();
        let wy = y - y0.clone();
        let wz = z - z0.clone();

        let x1 = x0.clone() + 1.0;
        let y1 = y0.clone() + 1.0;
        let z1 = z0.clone() + 1.0;

        // Clamped corners keep gathers in range; the mask zeroes anything that
        // was actually outside.
        let x0_i = x0.clamp(0.0, (d0 - 1) as f64).int();
        let y0_i = y0.clamp(0.0, (d1 - 1) as f64).int();
        let z0_i = z0.clamp(0.0, (d2 - 1) as f64).int();
        let x1_i = x1.clamp(0.0, (d0 - 1) as f64).int();
        let y1_i = y1.clamp(0.0, (d1 - 1) as f64).int();
        let z1_i = z1.clamp(0.0, (d2 - 1) as f64).int();

        // Row-major [X, Y, Z]
        let stride_x = (d1 * d2) as i32;
        let stride_y = d2 as i32;

        let flat_data = data.clone().reshape([d0 * d1 * d2]);

        let v000 = Self::gather(&flat_data, &x0_i, &y0_i, &z0_i, stride_x, stride_y);
        let v001 = Self::gather(&flat_data, &x0_i, &y0_i, &z1_i, stride_x, stride_y);
        let v010 = Self::gather(&flat_data, &x0_i, &y1_i, &z0_i, stride_x, stride_y);
        let v011 = Self::gather(&flat_data, &x0_i, &y1_i, &z1_i, stride_x, stride_y);
        let v100 = Self::gather(&flat_data, &x1_i, &y0_i, &z0_i, stride_x, stride_y);
        let v101 = Self::gather(&flat_data, &x1_i, &y0_i, &z1_i, stride_x, stride_y);
        let v110 = Self::gather(&flat_data, &x1_i, &y1_i, &z0_i, stride_x, stride_y);
        let v111 = Self::gather(&flat_data, &x1_i, &y1_i, &z1_i, stride_x, stride_y);

        let one = Tensor::<B, 1>::ones([batch_size], &device);
        let one_minus_wx = one.clone() - wx.clone();
        let one_minus_wy = one.clone() - wy.clone();
        let one_minus_wz = one - wz.clone();

        // Along x
        let c00 = v000 * one_minus_wx.clone() + v100 * wx.clone();
        let c01 = v001 * one_minus_wx.clone() + v101 * wx.clone();
        let c10 = v010 * one_minus_wx.clone() + v110 * wx.clone();
        let c11 = v011 * one_minus_wx + v111 * wx;

        // Along y
        let c0 = c00 * one_minus_wy.clone() + c10 * wy.clone();
        let c1 = c01 * one_minus_wy + c11 * wy;

        // Along z
        (c0 * one_minus_wz + c1 * wz) * mask
    }
}
