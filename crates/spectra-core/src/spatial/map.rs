//! Voxel-to-world spatial map.
//!
//! A [`SpatialMap`] is the 4×4 homogeneous affine that places a voxel grid in
//! physical space:
//!
//! `world = A · [i, j, k, 1]ᵀ`
//!
//! The field algebra only consumes the per-axis spacing (column norms of the
//! upper-left 3×3 block). Rotation and shear are ignored when scaling
//! displacements, which is exact only for axis-aligned grids.

use nalgebra::{Matrix3, Matrix4, Vector3 as NaVector3, Vector4};
use serde::{Deserialize, Serialize};

use super::{Direction, Point, Spacing, Vector};
use crate::error::{FieldError, Result};

/// Homogeneous voxel-index → world affine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialMap {
    affine: Matrix4<f64>,
}

impl SpatialMap {
    /// Create a spatial map from a 4×4 affine.
    ///
    /// Rejects non-finite entries, a bottom row other than `[0, 0, 0, 1]`, and
    /// any voxel axis with zero physical length.
    pub fn from_affine(affine: Matrix4<f64>) -> Result<Self> {
        if affine.iter().any(|v| !v.is_finite()) {
            return Err(FieldError::invalid_spatial_map(
                "affine contains non-finite entries",
            ));
        }
        let bottom = affine.row(3);
        if bottom[0] != 0.0 || bottom[1] != 0.0 || bottom[2] != 0.0 || bottom[3] != 1.0 {
            return Err(FieldError::invalid_spatial_map(format!(
                "bottom row must be [0, 0, 0, 1], got [{}, {}, {}, {}]",
                bottom[0], bottom[1], bottom[2], bottom[3]
            )));
        }
        let map = Self { affine };
        let spacing = map.spacing();
        if !spacing.is_valid() {
            return Err(FieldError::invalid_spatial_map(format!(
                "voxel axes must have positive length, got spacing {:?}",
                spacing.to_array()
            )));
        }
        if !map.is_axis_aligned() {
            tracing::debug!(
                "Spatial map is not axis-aligned; unit conversions use spacing {:?} only",
                spacing.to_array()
            );
        }
        Ok(map)
    }

    /// Create a spatial map from a row-major 4×4 array.
    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self> {
        let affine = Matrix4::from_fn(|r, c| rows[r][c]);
        Self::from_affine(affine)
    }

    /// Create a spatial map from origin, spacing and direction.
    ///
    /// `A[0..3, 0..3] = direction · diag(spacing)`, `A[0..3, 3] = origin`.
    pub fn from_parts(origin: Point<3>, spacing: Spacing<3>, direction: Direction<3>) -> Result<Self> {
        let linear = direction.inner() * Matrix3::from_diagonal(spacing.inner());
        let mut affine = Matrix4::identity();
        affine.fixed_view_mut::<3, 3>(0, 0).copy_from(&linear);
        affine
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&NaVector3::new(origin[0], origin[1], origin[2]));
        Self::from_affine(affine)
    }

    /// Axis-aligned map with the given spacing and zero origin.
    pub fn from_spacing(spacing: Spacing<3>) -> Result<Self> {
        Self::from_parts(Point::origin(), spacing, Direction::identity())
    }

    /// Unit-spacing, axis-aligned map at the origin.
    pub fn identity() -> Self {
        Self {
            affine: Matrix4::identity(),
        }
    }

    /// The underlying affine matrix.
    pub fn affine(&self) -> &Matrix4<f64> {
        &self.affine
    }

    /// Per-axis voxel spacing: Euclidean norms of the 3×3 block's columns.
    pub fn spacing(&self) -> Spacing<3> {
        let linear = self.affine.fixed_view::<3, 3>(0, 0);
        Vector::new([
            linear.column(0).norm(),
            linear.column(1).norm(),
            linear.column(2).norm(),
        ])
    }

    /// World position of voxel index `(0, 0, 0)`.
    pub fn origin(&self) -> Point<3> {
        Point::new([self.affine[(0, 3)], self.affine[(1, 3)], self.affine[(2, 3)]])
    }

    /// Unit direction of each voxel axis.
    pub fn direction(&self) -> Direction<3> {
        let linear: Matrix3<f64> = self.affine.fixed_view::<3, 3>(0, 0).clone_owned();
        let spacing = self.spacing();
        Direction(linear * Matrix3::from_diagonal(&spacing.inner().map(|s| 1.0 / s)))
    }

    /// True when displacement scaling by spacing alone is exact.
    pub fn is_axis_aligned(&self) -> bool {
        self.direction().is_axis_aligned()
    }

    /// Map a continuous voxel index to a world point.
    pub fn index_to_world(&self, index: [f64; 3]) -> Point<3> {
        let h = self.affine * Vector4::new(index[0], index[1], index[2], 1.0);
        Point::new([h[0], h[1], h[2]])
    }

    /// Map a world point to a continuous voxel index.
    pub fn world_to_index(&self, point: &Point<3>) -> Result<[f64; 3]> {
        let inverse = self.affine.try_inverse().ok_or_else(|| {
            FieldError::invalid_spatial_map("affine is singular and cannot map world to voxel")
        })?;
        let h = inverse * Vector4::new(point[0], point[1], point[2], 1.0);
        Ok([h[0], h[1], h[2]])
    }
}

impl Default for SpatialMap {
    fn default() -> Self {
        Self::identity()
    }
}

/// Per-axis voxel spacing of a spatial map.
pub fn spacing_of(map: &SpatialMap) -> Spacing<3> {
    map.spacing()
}
