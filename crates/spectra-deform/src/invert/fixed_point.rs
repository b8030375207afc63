//! Fixed-point inversion.
//!
//! The inverse `g` of `p ↦ p + d(p)` satisfies `g(x) = −d(x + g(x))`.
//! Starting from `g = 0`, the relation is iterated with trilinear sampling
//! of `d`, which converges when the field is a contraction. Points that have
//! no preimage (the iterate leaves the grid or keeps oscillating) are
//! zero-filled and counted.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};
use spectra_core::image::voxel_grid;
use spectra_core::interpolation::{inside_mask, Interpolator, LinearInterpolator};
use spectra_core::host::to_host;
use spectra_core::{DisplacementField, Result};

/// Output of a fixed-point inversion.
#[derive(Debug, Clone)]
pub(crate) struct FixedPointInverse<B: Backend> {
    /// Inverse displacement, `[X, Y, Z, 3]` voxel units.
    pub data: Tensor<B, 4>,
    /// Grid points whose preimage lies outside the grid or whose iterate did
    /// not settle; their displacement is zero.
    pub unresolved: usize,
    /// Iterations performed.
    pub iterations: usize,
    /// Largest update of the last iteration, in voxels.
    pub last_update: f64,
}

pub(crate) fn invert_fixed_point<B: Backend>(
    field: &DisplacementField<B>,
    iterations: usize,
    tolerance: f64,
) -> Result<FixedPointInverse<B>> {
    let device = field.device();
    let shape = field.grid_shape();
    let n = field.len();
    let grid = voxel_grid::<B>(shape, &device);
    let interpolator = LinearInterpolator;

    let mut g = Tensor::<B, 2>::zeros([n, 3], &device);
    let mut update = Tensor::<B, 1>::zeros([n], &device);
    let mut performed = 0;
    let mut last_update = f64::INFINITY;
    for iteration in 1..=iterations {
        let sampled = interpolator.interpolate_channels(field.data(), grid.clone() + g.clone());
        let next = -sampled;
        update = (next.clone() - g).abs().max_dim(1).squeeze::<1>(1);
        last_update = update.clone().max().into_scalar().elem::<f64>();
        g = next;
        performed = iteration;
        if last_update < tolerance {
            break;
        }
    }
    tracing::debug!(
        "Fixed-point inversion stopped after {} iterations (update {:.3e})",
        performed,
        last_update
    );

    // A point is resolved when its preimage is inside the grid and its own
    // iterate has settled; everything else is zero-filled.
    let settled = update.lower_equal_elem(tolerance).float();
    let resolved = inside_mask(&(grid + g.clone()), shape) * settled;
    let g = g * resolved.clone().unsqueeze_dim::<2>(1);
    let unresolved = to_host(resolved)?.iter().filter(|&&r| r < 0.5).count();

    let [x, y, z] = shape;
    Ok(FixedPointInverse {
        data: g.reshape([x, y, z, 3]),
        unresolved,
        iterations: performed,
        last_update,
    })
}
