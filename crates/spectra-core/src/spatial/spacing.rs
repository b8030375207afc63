//! Voxel spacing.
//!
//! Spacing is the physical edge length of one grid cell along each axis. It
//! is what converts displacements between voxel units and world units.

use super::Vector;

/// Physical distance between adjacent voxels along each axis.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        Self::new([value; D])
    }

    /// True when every component is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }

    /// Largest spacing component.
    pub fn max_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Physical volume of one voxel.
    pub fn cell_volume(&self) -> f64 {
        (0..D).map(|i| self[i]).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_validity() {
        assert!(Spacing3::new([1.0, 2.0, 0.5]).is_valid());
        assert!(!Spacing3::new([1.0, 0.0, 0.5]).is_valid());
        assert!(!Spacing3::new([1.0, f64::NAN, 0.5]).is_valid());
    }

    #[test]
    fn test_extents() {
        let s = Spacing3::new([1.0, 2.0, 0.5]);
        assert_eq!(s.max_spacing(), 2.0);
        assert!((s.cell_volume() - 1.0).abs() < 1e-12);
        assert_eq!(Spacing3::uniform(3.0), Spacing3::new([3.0, 3.0, 3.0]));
    }
}
