#![allow(dead_code)]

use burn_ndarray::NdArray;
use spectra_core::host::from_host;
use spectra_core::image::voxel_count;
use spectra_core::{DisplacementField, Image, SpatialMap};

pub type Backend = NdArray<f32>;

pub fn device() -> <Backend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

/// Field with `d(p) = f(p)` on a grid of `shape`.
pub fn field_from_fn<F>(shape: [usize; 3], map: SpatialMap, f: F) -> DisplacementField<Backend>
where
    F: Fn([usize; 3]) -> [f64; 3],
{
    let mut values = Vec::with_capacity(3 * voxel_count(shape));
    for x in 0..shape[0] {
        for y in 0..shape[1] {
            for z in 0..shape[2] {
                values.extend_from_slice(&f([x, y, z]));
            }
        }
    }
    let data = from_host::<Backend, 4>(&values, [shape[0], shape[1], shape[2], 3], &device());
    DisplacementField::new(data, map).expect("valid field")
}

/// Smooth, non-folding field on an `n³` grid that vanishes on the boundary.
/// Each component is a scaled product of parabolas `4t(n−1−t)/(n−1)²`.
pub fn bump_field(n: usize, amplitude: f64) -> DisplacementField<Backend> {
    let m = (n - 1) as f64;
    let bump = |t: usize| 4.0 * t as f64 * (m - t as f64) / (m * m);
    field_from_fn([n, n, n], SpatialMap::identity(), |[x, y, z]| {
        let b = bump(x) * bump(y) * bump(z);
        [amplitude * b, -0.6 * amplitude * b, 0.8 * amplitude * b]
    })
}

/// Image with `I(p) = f(p)`.
pub fn image_from_fn<F>(shape: [usize; 3], map: SpatialMap, f: F) -> Image<Backend>
where
    F: Fn([usize; 3]) -> f64,
{
    let mut values = Vec::with_capacity(voxel_count(shape));
    for x in 0..shape[0] {
        for y in 0..shape[1] {
            for z in 0..shape[2] {
                values.push(f([x, y, z]));
            }
        }
    }
    Image::new(from_host::<Backend, 3>(&values, shape, &device()), map)
}

pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}
