//! Volumes and voxel grids.

pub mod image;
pub mod spectral;
pub mod grid;

pub use image::Image;
pub use spectral::SpectralImage;
pub use grid::{flat_index, voxel_count, voxel_grid};
