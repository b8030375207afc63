//! Warping images with displacement fields.
//!
//! The warped image is `J(p) = I(p + d(p))`: every output voxel pulls its
//! value from the displaced position in the source. Displaced positions are
//! formed in world units with the field's spacing and converted back to the
//! image's voxel grid with the image's spacing.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use spectra_core::field::spacing_tensor;
use spectra_core::image::voxel_grid;
use spectra_core::{
    DisplacementField, FieldError, Image, Interpolation, Interpolator, Result, SpectralImage,
};

use crate::config::WarpConfig;

/// Resamples images through a displacement field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldWarper {
    config: WarpConfig,
}

impl FieldWarper {
    /// Create a warper with linear interpolation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a warper with explicit settings.
    pub fn with_config(config: WarpConfig) -> Self {
        Self { config }
    }

    /// Create a warper from a numeric interpolation order.
    ///
    /// # Errors
    /// `InvalidConfiguration` for orders other than 0 and 1.
    pub fn with_order(order: u32) -> Result<Self> {
        Ok(Self::with_config(WarpConfig::new().with_order(order)?))
    }

    /// Interpolation mode in use.
    pub fn interpolation(&self) -> Interpolation {
        self.config.interpolation
    }

    /// Continuous image indices `[N, 3]` sampled by each output voxel.
    fn displaced_indices<B: Backend>(
        &self,
        field: &DisplacementField<B>,
        image_shape: [usize; 3],
        image_spacing: Tensor<B, 1>,
    ) -> Result<Tensor<B, 2>> {
        field.validate()?;
        if field.grid_shape() != image_shape {
            return Err(FieldError::shape_mismatch(&image_shape, &field.grid_shape()));
        }
        let device = field.device();
        let field_spacing = spacing_tensor::<B>(&field.spacing(), &device).reshape([1, 3]);
        let grid = voxel_grid::<B>(image_shape, &device);
        let world = (grid + field.vectors()) * field_spacing;
        Ok(world / image_spacing.reshape([1, 3]))
    }

    /// Warp a scalar image.
    ///
    /// # Errors
    /// `ShapeMismatch` when the field's grid differs from the image's.
    pub fn apply<B: Backend>(
        &self,
        image: &Image<B>,
        field: &DisplacementField<B>,
    ) -> Result<Image<B>> {
        let shape = image.shape();
        let spacing = spacing_tensor::<B>(&image.spacing(), &image.device());
        let indices = self.displaced_indices(field, shape, spacing)?;

        tracing::debug!(
            "Warping image {:?} with {:?} interpolation",
            shape,
            self.config.interpolation
        );
        let values = self.config.interpolation.interpolate(image.data(), indices);
        tracing::info!("Warped image of shape {:?}", shape);
        Ok(Image::new(values.reshape(shape), *image.map()))
    }

    /// Warp every channel of a spectral image with one coordinate
    /// computation.
    pub fn apply_spectral<B: Backend>(
        &self,
        image: &SpectralImage<B>,
        field: &DisplacementField<B>,
    ) -> Result<SpectralImage<B>> {
        let shape = image.grid_shape();
        let channels = image.num_channels();
        let spacing =
            spacing_tensor::<B>(&image.map().spacing(), &image.data().device());
        let indices = self.displaced_indices(field, shape, spacing)?;

        tracing::debug!(
            "Warping spectral image {:?} with {} channels",
            shape,
            channels
        );
        let values = self
            .config
            .interpolation
            .interpolate_channels(image.data(), indices);
        let [x, y, z] = shape;
        tracing::info!("Warped spectral image of shape {:?}", [x, y, z, channels]);
        SpectralImage::new(values.reshape([x, y, z, channels]), *image.map())
    }
}

/// Warp `image` with `field` using the given interpolation.
pub fn warp<B: Backend>(
    image: &Image<B>,
    field: &DisplacementField<B>,
    interpolation: Interpolation,
) -> Result<Image<B>> {
    FieldWarper::with_config(WarpConfig::new().with_interpolation(interpolation)).apply(image, field)
}
