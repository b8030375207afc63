//! Dense displacement field.
//!
//! A displacement field stores, for every voxel `p` of a grid, the offset
//! `d(p)` in *voxel units of its own grid*, and represents the map
//! `p ↦ p + d(p)`. The field is always paired with the spatial map of the grid
//! it was produced on; the map's spacing converts the voxel-unit offsets to
//! world units when fields from different grids are combined.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};

use crate::error::{FieldError, Result};
use crate::image::voxel_count;
use crate::spatial::{Spacing, SpatialMap};

/// Validate that a shape describes a channel-last 3D vector field.
///
/// Fails with `InvalidFieldRank` unless the shape is `[X, Y, Z, 3]`.
pub fn validate_field_shape(shape: &[usize]) -> Result<()> {
    if shape.len() != 4 || shape[3] != 3 {
        return Err(FieldError::invalid_field_rank(shape));
    }
    Ok(())
}

/// Dense 3D displacement field with shape `[X, Y, Z, 3]`.
///
/// # Examples
/// ```rust
/// use spectra_core::{DisplacementField, SpatialMap};
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let field = DisplacementField::<Backend>::zeros([8, 8, 8], SpatialMap::identity(), &device);
/// assert_eq!(field.shape(), [8, 8, 8, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct DisplacementField<B: Backend> {
    data: Tensor<B, 4>,
    map: SpatialMap,
}

impl<B: Backend> DisplacementField<B> {
    /// Create a displacement field from a channel-last tensor.
    ///
    /// Fails with `InvalidFieldRank` when the trailing dimension is not 3.
    pub fn new(data: Tensor<B, 4>, map: SpatialMap) -> Result<Self> {
        validate_field_shape(&data.dims())?;
        Ok(Self { data, map })
    }

    /// Create a displacement field from untyped tensor data.
    pub fn from_data(data: TensorData, map: SpatialMap, device: &B::Device) -> Result<Self> {
        validate_field_shape(&data.shape)?;
        Self::new(Tensor::<B, 4>::from_data(data, device), map)
    }

    /// Create a field from a channel-first `[3, X, Y, Z]` tensor.
    pub fn from_channel_first(data: Tensor<B, 4>, map: SpatialMap) -> Result<Self> {
        let dims = data.dims();
        if dims[0] != 3 {
            return Err(FieldError::invalid_field_rank(&dims));
        }
        Self::new(data.permute([1, 2, 3, 0]), map)
    }

    /// The identity mapping on a grid.
    pub fn zeros(grid_shape: [usize; 3], map: SpatialMap, device: &B::Device) -> Self {
        let [x, y, z] = grid_shape;
        Self {
            data: Tensor::zeros([x, y, z, 3], device),
            map,
        }
    }

    /// Get the `[X, Y, Z, 3]` data tensor.
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Consume the field, returning its data tensor.
    pub fn into_data(self) -> Tensor<B, 4> {
        self.data
    }

    /// Get the spatial map of the field's grid.
    pub fn map(&self) -> &SpatialMap {
        &self.map
    }

    /// Per-axis voxel spacing of the field's grid.
    pub fn spacing(&self) -> Spacing<3> {
        self.map.spacing()
    }

    /// Full shape `[X, Y, Z, 3]`.
    pub fn shape(&self) -> [usize; 4] {
        self.data.dims()
    }

    /// Grid extents `[X, Y, Z]`.
    pub fn grid_shape(&self) -> [usize; 3] {
        let [x, y, z, _] = self.data.dims();
        [x, y, z]
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        voxel_count(self.grid_shape())
    }

    /// True when the grid has no voxels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Device holding the field data.
    pub fn device(&self) -> B::Device {
        self.data.device()
    }

    /// Re-check the structural invariant.
    pub fn validate(&self) -> Result<()> {
        validate_field_shape(&self.shape())
    }

    /// Channel-first `[3, X, Y, Z]` view used by Jacobian analysis.
    pub fn to_channel_first(&self) -> Tensor<B, 4> {
        self.data.clone().permute([3, 0, 1, 2])
    }

    /// One displacement component as a `[X, Y, Z]` volume.
    pub fn component(&self, axis: usize) -> Tensor<B, 3> {
        self.data.clone().narrow(3, axis, 1).squeeze::<3>(3)
    }

    /// Displacements as a `[N, 3]` table in flat voxel order.
    pub fn vectors(&self) -> Tensor<B, 2> {
        self.data.clone().reshape([self.len(), 3])
    }

    /// Displacements converted to world units, shape `[X, Y, Z, 3]`.
    pub fn world_displacement(&self) -> Tensor<B, 4> {
        self.data.clone() * spacing_tensor::<B>(&self.spacing(), &self.device()).reshape([1, 1, 1, 3])
    }

    /// Per-voxel displacement length in voxel units, shape `[X, Y, Z]`.
    pub fn magnitude(&self) -> Tensor<B, 3> {
        self.data
            .clone()
            .powf_scalar(2.0)
            .sum_dim(3)
            .sqrt()
            .squeeze::<3>(3)
    }
}

/// Spacing as a `[3]` tensor on `device`.
pub fn spacing_tensor<B: Backend>(spacing: &Spacing<3>, device: &B::Device) -> Tensor<B, 1> {
    Tensor::<B, 1>::from_data(TensorData::new(spacing.to_f32_vec(), Shape::new([3])), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{from_host, to_host};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rejects_two_component_field() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 4>::zeros([4, 4, 4, 2], &device);
        let err = DisplacementField::new(data, SpatialMap::identity()).unwrap_err();
        assert!(matches!(err, FieldError::InvalidFieldRank { .. }));
    }

    #[test]
    fn test_from_data_rejects_rank_three() {
        let device = Default::default();
        let data = TensorData::new(vec![0.0f32; 27], Shape::new([3, 3, 3]));
        let err = DisplacementField::<TestBackend>::from_data(data, SpatialMap::identity(), &device)
            .unwrap_err();
        assert_eq!(err, FieldError::invalid_field_rank(&[3, 3, 3]));
    }

    #[test]
    fn test_channel_first_roundtrip() {
        let device = Default::default();
        let values: Vec<f64> = (0..2 * 3 * 4 * 3).map(|v| v as f64).collect();
        let data = from_host::<TestBackend, 4>(&values, [2, 3, 4, 3], &device);
        let field = DisplacementField::new(data, SpatialMap::identity()).unwrap();

        let chw = field.to_channel_first();
        assert_eq!(chw.dims(), [3, 2, 3, 4]);
        let back = DisplacementField::from_channel_first(chw, SpatialMap::identity()).unwrap();
        assert_eq!(to_host(back.into_data()).unwrap(), values);
    }

    #[test]
    fn test_world_displacement_scales_by_spacing() {
        let device = Default::default();
        let map = SpatialMap::from_spacing(Spacing::new([2.0, 0.5, 3.0])).unwrap();
        let data = Tensor::<TestBackend, 4>::ones([2, 2, 2, 3], &device);
        let field = DisplacementField::new(data, map).unwrap();

        let world = to_host(field.world_displacement()).unwrap();
        for chunk in world.chunks(3) {
            assert_eq!(chunk, &[2.0, 0.5, 3.0]);
        }
        let magnitude = to_host(field.magnitude()).unwrap();
        assert!(magnitude.iter().all(|m| (m - 3f64.sqrt()).abs() < 1e-6));
    }
}
