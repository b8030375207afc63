//! Direction cosines of the voxel axes.

use nalgebra::SMatrix;
use serde::{Deserialize, Serialize};
use super::Vector;

/// Orientation matrix whose column `i` is the unit direction of voxel axis `i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Axis-aligned orientation.
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Check if the matrix is orthogonal within `1e-6`.
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    /// True when every axis is parallel to a world axis, i.e. the spacing
    /// approximation used for displacement scaling is exact.
    pub fn is_axis_aligned(&self) -> bool {
        (0..D).all(|c| {
            let nonzero = (0..D).filter(|&r| self.0[(r, c)].abs() > 1e-9).count();
            nonzero == 1
        })
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
