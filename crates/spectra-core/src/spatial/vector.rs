//! Vector type for displacements, spacings and axis directions.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// A vector in D-dimensional physical space.
///
/// Thin wrapper around nalgebra's `SVector` so that spacing, offsets and
/// world-space displacements share one type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Components as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        let mut out = [0.0; D];
        for (i, value) in out.iter_mut().enumerate() {
            *value = self.0[i];
        }
        out
    }

    /// Components narrowed to `f32`, in the order tensors expect them.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        (0..D).map(|i| self.0[i] as f32).collect()
    }

    /// Euclidean length.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Element-wise product.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Element-wise quotient.
    pub fn component_div(&self, other: &Self) -> Self {
        Self(self.0.component_div(&other.0))
    }

    /// Get the inner nalgebra vector.
    pub fn inner(&self) -> &SVector<f64, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}
