//! Scalar volume paired with its spatial map.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use crate::error::{FieldError, Result};
use crate::spatial::{Spacing, SpatialMap};

/// Dense scalar volume over a voxel grid.
///
/// The tensor has shape `[X, Y, Z]`; the spatial map places voxel `(x, y, z)`
/// in world space. Images are immutable values: every operation returns a new
/// image.
///
/// # Examples
/// ```rust
/// use spectra_core::{Image, SpatialMap};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let data = Tensor::<Backend, 3>::zeros([10, 10, 10], &device);
/// let image = Image::new(data, SpatialMap::identity());
/// assert_eq!(image.shape(), [10, 10, 10]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend> {
    data: Tensor<B, 3>,
    map: SpatialMap,
}

impl<B: Backend> Image<B> {
    /// Create a new image with the given data and spatial map.
    pub fn new(data: Tensor<B, 3>, map: SpatialMap) -> Self {
        Self { data, map }
    }

    /// Create an image from untyped tensor data.
    ///
    /// Fails with `InvalidConfiguration` when the data is not three-dimensional.
    pub fn from_data(data: TensorData, map: SpatialMap, device: &B::Device) -> Result<Self> {
        if data.shape.len() != 3 {
            tracing::debug!("Rejected image data of shape {:?}", data.shape);
            return Err(FieldError::invalid_configuration(format!(
                "image data must have rank 3 [X, Y, Z], got shape {:?}",
                data.shape
            )));
        }
        Ok(Self::new(Tensor::<B, 3>::from_data(data, device), map))
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, 3> {
        &self.data
    }

    /// Consume the image, returning its data tensor.
    pub fn into_data(self) -> Tensor<B, 3> {
        self.data
    }

    /// Get the spatial map.
    pub fn map(&self) -> &SpatialMap {
        &self.map
    }

    /// Per-axis voxel spacing.
    pub fn spacing(&self) -> Spacing<3> {
        self.map.spacing()
    }

    /// Grid extents `[X, Y, Z]`.
    pub fn shape(&self) -> [usize; 3] {
        self.data.dims()
    }

    /// Device holding the image data.
    pub fn device(&self) -> B::Device {
        self.data.device()
    }
}
