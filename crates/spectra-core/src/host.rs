//! Moving tensor contents between the backend and host memory.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{FieldError, Result};

/// Read a tensor back into a flat, row-major `f64` buffer.
pub fn to_host<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>> {
    tensor
        .into_data()
        .convert::<f64>()
        .to_vec::<f64>()
        .map_err(|e| FieldError::tensor_data(format!("{:?}", e)))
}

/// Build a tensor on `device` from a flat, row-major `f64` buffer.
///
/// Values are narrowed to `f32` before upload.
pub fn from_host<B: Backend, const D: usize>(
    values: &[f64],
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D> {
    let narrowed: Vec<f32> = values.iter().map(|&v| v as f32).collect();
    Tensor::<B, D>::from_data(TensorData::new(narrowed, Shape::new(shape)), device)
}
