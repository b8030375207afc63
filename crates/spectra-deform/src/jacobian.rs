//! Jacobian determinant of displacement fields.
//!
//! For the map `p ↦ p + d(p)` the determinant of `I + ∇d` measures local
//! volume change: 1 means no change, above 1 expansion, below 1 contraction,
//! and values ≤ 0 mark folds. Derivatives are finite differences in voxel
//! units.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};
use spectra_core::host::to_host;
use spectra_core::{DisplacementField, FieldError, Result};

use crate::config::{JacobianConfig, JacobianConvention};

/// Determinant volume together with the scheme that produced it.
#[derive(Debug, Clone)]
pub struct JacobianMap<B: Backend> {
    determinant: Tensor<B, 3>,
    convention: JacobianConvention,
}

impl<B: Backend> JacobianMap<B> {
    /// Determinant volume.
    pub fn determinant(&self) -> &Tensor<B, 3> {
        &self.determinant
    }

    /// Consume the map, returning the determinant volume.
    pub fn into_determinant(self) -> Tensor<B, 3> {
        self.determinant
    }

    /// Difference scheme used.
    pub fn convention(&self) -> JacobianConvention {
        self.convention
    }

    /// Shape of the determinant volume.
    pub fn shape(&self) -> [usize; 3] {
        self.determinant.dims()
    }

    /// Statistics of the determinant volume.
    pub fn summary(&self) -> Result<JacobianSummary> {
        let summary = JacobianSummary::from_values(&to_host(self.determinant.clone())?);
        if summary.has_folds() {
            tracing::warn!(
                "Field folds at {} of {} voxels (min determinant {:.4})",
                summary.folds,
                summary.voxels,
                summary.min
            );
        }
        Ok(summary)
    }
}

/// Statistics of a determinant volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JacobianSummary {
    /// Smallest determinant; `+inf` for an empty volume.
    pub min: f64,
    /// Largest determinant; `-inf` for an empty volume.
    pub max: f64,
    /// Mean determinant; zero for an empty volume.
    pub mean: f64,
    /// Voxels with determinant ≤ 0.
    pub folds: usize,
    /// Voxels summarized.
    pub voxels: usize,
}

impl JacobianSummary {
    /// Summarize determinant values.
    pub fn from_values(values: &[f64]) -> Self {
        let voxels = values.len();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = if voxels == 0 {
            0.0
        } else {
            values.iter().sum::<f64>() / voxels as f64
        };
        let folds = values.iter().filter(|&&v| v <= 0.0).count();
        Self {
            min,
            max,
            mean,
            folds,
            voxels,
        }
    }

    /// Fraction of voxels that fold.
    pub fn fold_fraction(&self) -> f64 {
        if self.voxels == 0 {
            0.0
        } else {
            self.folds as f64 / self.voxels as f64
        }
    }

    /// True when any voxel has a non-positive determinant.
    pub fn has_folds(&self) -> bool {
        self.folds > 0
    }
}

/// Computes Jacobian determinants of displacement fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct JacobianFilter {
    config: JacobianConfig,
}

impl JacobianFilter {
    /// Create a filter with the forward-trimmed convention.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filter with explicit settings.
    pub fn with_config(config: JacobianConfig) -> Self {
        Self { config }
    }

    /// Create a filter with the given convention.
    pub fn with_convention(convention: JacobianConvention) -> Self {
        Self::with_config(JacobianConfig::new().with_convention(convention))
    }

    /// Determinant of a displacement field.
    pub fn apply<B: Backend>(&self, field: &DisplacementField<B>) -> Result<JacobianMap<B>> {
        field.validate()?;
        self.apply_channel_first(field.to_channel_first())
    }

    /// Determinant of a channel-first `[3, X, Y, Z]` field.
    ///
    /// # Errors
    /// `InvalidFieldRank` when the leading dimension is not 3; `GridTooSmall`
    /// when any spatial extent is below 2.
    pub fn apply_channel_first<B: Backend>(&self, field_chw: Tensor<B, 4>) -> Result<JacobianMap<B>> {
        let dims = field_chw.dims();
        if dims[0] != 3 {
            return Err(FieldError::invalid_field_rank(&dims));
        }
        if dims[1..].iter().any(|&n| n < 2) {
            return Err(FieldError::grid_too_small(&dims[1..]));
        }

        let (dx, dy, dz) = match self.config.convention {
            JacobianConvention::ForwardTrimmed => forward_differences(field_chw),
            JacobianConvention::CenteredGradient => (
                centered_gradient(field_chw.clone(), 1),
                centered_gradient(field_chw.clone(), 2),
                centered_gradient(field_chw, 3),
            ),
        };
        let determinant = determinant(dx, dy, dz);
        tracing::debug!(
            "Jacobian determinant {:?} -> {:?} ({:?})",
            &dims[1..],
            determinant.dims(),
            self.config.convention
        );
        Ok(JacobianMap {
            determinant,
            convention: self.config.convention,
        })
    }
}

/// Jacobian determinant of a channel-first field with forward differences,
/// shape `(X−1, Y−1, Z−1)`.
pub fn jacobian_determinant<B: Backend>(field_chw: Tensor<B, 4>) -> Result<Tensor<B, 3>> {
    JacobianFilter::new()
        .apply_channel_first(field_chw)
        .map(JacobianMap::into_determinant)
}

/// Forward differences along each spatial axis, all cropped to the common
/// `(X−1, Y−1, Z−1)` block anchored at the origin.
fn forward_differences<B: Backend>(
    field: Tensor<B, 4>,
) -> (Tensor<B, 4>, Tensor<B, 4>, Tensor<B, 4>) {
    let [c, h, w, d] = field.dims();
    let base = field.clone().slice([0..c, 0..(h - 1), 0..(w - 1), 0..(d - 1)]);
    let dx = field.clone().slice([0..c, 1..h, 0..(w - 1), 0..(d - 1)]) - base.clone();
    let dy = field.clone().slice([0..c, 0..(h - 1), 1..w, 0..(d - 1)]) - base.clone();
    let dz = field.slice([0..c, 0..(h - 1), 0..(w - 1), 1..d]) - base;
    (dx, dy, dz)
}

/// Derivative along `dim`: centred differences inside, one-sided
/// differences on the first and last slice.
fn centered_gradient<B: Backend>(field: Tensor<B, 4>, dim: usize) -> Tensor<B, 4> {
    let n = field.dims()[dim];
    let first = field.clone().narrow(dim, 1, 1) - field.clone().narrow(dim, 0, 1);
    let last = field.clone().narrow(dim, n - 1, 1) - field.clone().narrow(dim, n - 2, 1);
    if n == 2 {
        return Tensor::cat(vec![first, last], dim);
    }
    let interior =
        (field.clone().narrow(dim, 2, n - 2) - field.narrow(dim, 0, n - 2)).mul_scalar(0.5);
    Tensor::cat(vec![first, interior, last], dim)
}

/// `∂d_component / ∂axis`, plus one on the diagonal of `I + ∇d`.
fn entry<B: Backend>(partials: &Tensor<B, 4>, component: usize, axis: usize) -> Tensor<B, 3> {
    let e = partials.clone().narrow(0, component, 1).squeeze::<3>(0);
    if component == axis {
        e + 1.0
    } else {
        e
    }
}

/// Cofactor expansion of `det(I + ∇d)` along the first component.
fn determinant<B: Backend>(
    dx: Tensor<B, 4>,
    dy: Tensor<B, 4>,
    dz: Tensor<B, 4>,
) -> Tensor<B, 3> {
    let (a00, a10, a20) = (entry(&dx, 0, 0), entry(&dx, 1, 0), entry(&dx, 2, 0));
    let (a01, a11, a21) = (entry(&dy, 0, 1), entry(&dy, 1, 1), entry(&dy, 2, 1));
    let (a02, a12, a22) = (entry(&dz, 0, 2), entry(&dz, 1, 2), entry(&dz, 2, 2));

    let c0 = a11.clone() * a22.clone() - a12.clone() * a21.clone();
    let c1 = a10.clone() * a22 - a12 * a20.clone();
    let c2 = a10 * a21 - a11 * a20;
    a00 * c0 - a01 * c1 + a02 * c2
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use spectra_core::host::from_host;
    use spectra_core::image::flat_index;

    type TestBackend = NdArray<f32>;

    /// Channel-first field `[3, n, n, n]` with `d_c(p) = f(c, p)`.
    fn chw_field<F: Fn(usize, [usize; 3]) -> f64>(n: usize, f: F) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        let mut values = Vec::with_capacity(3 * n * n * n);
        for c in 0..3 {
            for x in 0..n {
                for y in 0..n {
                    for z in 0..n {
                        values.push(f(c, [x, y, z]));
                    }
                }
            }
        }
        from_host::<TestBackend, 4>(&values, [3, n, n, n], &device)
    }

    #[test]
    fn test_zero_field_is_one() {
        let det = jacobian_determinant(chw_field(5, |_, _| 0.0)).unwrap();
        assert_eq!(det.dims(), [4, 4, 4]);
        assert!(to_host(det).unwrap().iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_uniform_scaling() {
        let det = jacobian_determinant(chw_field(6, |c, p| 0.1 * p[c] as f64)).unwrap();
        assert!(to_host(det)
            .unwrap()
            .iter()
            .all(|v| (v - 1.331).abs() < 1e-4));
    }

    #[test]
    fn test_shear_preserves_volume() {
        // d_x = 0.5·y: off-diagonal only.
        let det = jacobian_determinant(chw_field(4, |c, p| if c == 0 { 0.5 * p[1] as f64 } else { 0.0 }))
            .unwrap();
        assert!(to_host(det).unwrap().iter().all(|v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_fold_is_reported() {
        // d_x = −2·x reverses the x axis.
        let filter = JacobianFilter::new();
        let map = filter
            .apply_channel_first(chw_field(4, |c, p| if c == 0 { -2.0 * p[0] as f64 } else { 0.0 }))
            .unwrap();
        let summary = map.summary().unwrap();
        assert_eq!(summary.folds, 27);
        assert_eq!(summary.fold_fraction(), 1.0);
        assert!((summary.min + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_statistics() {
        let summary = JacobianSummary::from_values(&[1.5, 0.0, 2.0, -0.5]);
        assert_eq!(summary.voxels, 4);
        assert_eq!(summary.min, -0.5);
        assert_eq!(summary.max, 2.0);
        assert!((summary.mean - 0.75).abs() < 1e-12);
        assert_eq!(summary.folds, 2);
        assert!(summary.has_folds());

        let empty = JacobianSummary::from_values(&[]);
        assert_eq!(empty.mean, 0.0);
        assert_eq!(empty.fold_fraction(), 0.0);
        assert!(!empty.has_folds());
        assert_eq!(empty.min, f64::INFINITY);
    }

    #[test]
    fn test_centered_gradient_full_grid() {
        let filter = JacobianFilter::with_convention(JacobianConvention::CenteredGradient);
        let map = filter
            .apply_channel_first(chw_field(5, |c, p| 0.1 * p[c] as f64))
            .unwrap();
        assert_eq!(map.shape(), [5, 5, 5]);
        assert_eq!(map.convention(), JacobianConvention::CenteredGradient);
        let values = to_host(map.into_determinant()).unwrap();
        assert!(values.iter().all(|v| (v - 1.331).abs() < 1e-4));
    }

    #[test]
    fn test_centered_gradient_quadratic() {
        // d_x = x² / 2: centred ∂/∂x = x inside, one-sided at the ends.
        let filter = JacobianFilter::with_convention(JacobianConvention::CenteredGradient);
        let det = filter
            .apply_channel_first(chw_field(5, |c, p| {
                if c == 0 {
                    0.5 * (p[0] * p[0]) as f64
                } else {
                    0.0
                }
            }))
            .unwrap()
            .into_determinant();
        let values = to_host(det).unwrap();
        let at = |x: usize| values[flat_index([5, 5, 5], x, 2, 2)];
        assert!((at(0) - 1.5).abs() < 1e-6);
        assert!((at(2) - 3.0).abs() < 1e-6);
        assert!((at(4) - 4.5).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_small_or_malformed_grids() {
        let device = Default::default();
        let thin = Tensor::<TestBackend, 4>::zeros([3, 1, 4, 4], &device);
        assert!(matches!(
            jacobian_determinant(thin),
            Err(FieldError::GridTooSmall { .. })
        ));
        let two_channel = Tensor::<TestBackend, 4>::zeros([2, 4, 4, 4], &device);
        assert!(matches!(
            jacobian_determinant(two_channel),
            Err(FieldError::InvalidFieldRank { .. })
        ));
    }
}
