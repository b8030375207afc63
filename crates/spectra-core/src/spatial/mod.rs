//! Spatial types: points, vectors, spacing, direction and the voxel-to-world map.
//!
//! All types are thin wrappers over nalgebra so that host-side geometry stays
//! in `f64` while tensor data lives on the burn backend.

pub mod point;
pub mod vector;
pub mod spacing;
pub mod direction;
pub mod map;

pub use point::Point;
pub use vector::Vector;
pub use spacing::Spacing;
pub use direction::Direction;
pub use map::{spacing_of, SpatialMap};

