//! Multi-channel spectral volume.
//!
//! A spectral acquisition stores one volume per spectral point, all sharing a
//! single grid and spatial map. Keeping them in one `[X, Y, Z, C]` tensor lets
//! a single displacement field resample every channel with one coordinate
//! computation.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::Image;
use crate::error::{FieldError, Result};
use crate::spatial::SpatialMap;

/// Stack of co-registered volumes with shape `[X, Y, Z, C]`.
#[derive(Debug, Clone)]
pub struct SpectralImage<B: Backend> {
    data: Tensor<B, 4>,
    map: SpatialMap,
}

impl<B: Backend> SpectralImage<B> {
    /// Create a spectral image from a `[X, Y, Z, C]` tensor.
    ///
    /// Fails with `ShapeMismatch` when there are no channels.
    pub fn new(data: Tensor<B, 4>, map: SpatialMap) -> Result<Self> {
        let dims = data.dims();
        if dims[3] == 0 {
            return Err(FieldError::shape_mismatch(&[dims[0], dims[1], dims[2], 1], &dims));
        }
        Ok(Self { data, map })
    }

    /// Stack scalar volumes into one spectral image.
    ///
    /// All channels must share the same grid shape; the first channel's map is
    /// kept.
    pub fn from_channels(channels: Vec<Image<B>>) -> Result<Self> {
        let first = channels.first().ok_or_else(|| {
            FieldError::invalid_configuration("a spectral image needs at least one channel")
        })?;
        let shape = first.shape();
        let map = *first.map();
        if let Some(other) = channels.iter().find(|c| c.shape() != shape) {
            return Err(FieldError::shape_mismatch(&shape, &other.shape()));
        }
        let stacked = Tensor::stack::<4>(
            channels.into_iter().map(Image::into_data).collect(),
            3,
        );
        Self::new(stacked, map)
    }

    /// Get the `[X, Y, Z, C]` data tensor.
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Get the spatial map.
    pub fn map(&self) -> &SpatialMap {
        &self.map
    }

    /// Grid extents `[X, Y, Z]`.
    pub fn grid_shape(&self) -> [usize; 3] {
        let [x, y, z, _] = self.data.dims();
        [x, y, z]
    }

    /// Number of spectral points.
    pub fn num_channels(&self) -> usize {
        self.data.dims()[3]
    }

    /// Extract one spectral point as a scalar image.
    pub fn channel(&self, index: usize) -> Result<Image<B>> {
        let channels = self.num_channels();
        if index >= channels {
            return Err(FieldError::invalid_configuration(format!(
                "channel {} out of range for {} channels",
                index, channels
            )));
        }
        let volume = self.data.clone().narrow(3, index, 1).squeeze::<3>(3);
        Ok(Image::new(volume, self.map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::to_host;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_stack_and_extract_channels() {
        let device = Default::default();
        let a = Image::new(Tensor::<TestBackend, 3>::zeros([3, 3, 3], &device), SpatialMap::identity());
        let b = Image::new(Tensor::<TestBackend, 3>::ones([3, 3, 3], &device), SpatialMap::identity());
        let spectral = SpectralImage::from_channels(vec![a, b]).unwrap();
        assert_eq!(spectral.num_channels(), 2);
        assert_eq!(spectral.grid_shape(), [3, 3, 3]);

        let second = spectral.channel(1).unwrap();
        assert!(to_host(second.into_data()).unwrap().iter().all(|&v| v == 1.0));
        assert!(spectral.channel(2).is_err());
    }

    #[test]
    fn test_mismatched_channels_rejected() {
        let device = Default::default();
        let a = Image::new(Tensor::<TestBackend, 3>::zeros([3, 3, 3], &device), SpatialMap::identity());
        let b = Image::new(Tensor::<TestBackend, 3>::zeros([3, 3, 2], &device), SpatialMap::identity());
        let result = SpectralImage::from_channels(vec![a, b]);
        assert!(matches!(result, Err(FieldError::ShapeMismatch { .. })));
    }
}
