mod common;

use anyhow::Result;
use common::{bump_field, device, field_from_fn, image_from_fn, max_abs_diff, Backend};
use spectra_core::host::to_host;
use spectra_core::image::flat_index;
use spectra_core::{DisplacementField, FieldError, Interpolation, SpatialMap};
use spectra_deform::{compose, invert, jacobian_determinant, warp, JacobianFilter};

#[test]
fn test_compose_with_identity() -> Result<()> {
    let d = bump_field(12, 1.5);
    let zero = DisplacementField::<Backend>::zeros([12, 12, 12], SpatialMap::identity(), &device());
    let expected = to_host(d.data().clone())?;

    let left = to_host(compose(&zero, &d)?.into_data())?;
    let right = to_host(compose(&d, &zero)?.into_data())?;
    assert!(max_abs_diff(&left, &expected) < 1e-5);
    assert!(max_abs_diff(&right, &expected) < 1e-5);
    Ok(())
}

#[test]
fn test_compose_shape_mismatch() {
    let a = DisplacementField::<Backend>::zeros([10, 10, 10], SpatialMap::identity(), &device());
    let b = DisplacementField::<Backend>::zeros([8, 8, 8], SpatialMap::identity(), &device());
    match compose(&a, &b) {
        Err(FieldError::ShapeMismatch { expected, actual }) => {
            assert_eq!(expected, vec![10, 10, 10, 3]);
            assert_eq!(actual, vec![8, 8, 8, 3]);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
}

#[test]
fn test_jacobian_of_identity_and_scaling() -> Result<()> {
    let zero = DisplacementField::<Backend>::zeros([6, 6, 6], SpatialMap::identity(), &device());
    let det = to_host(jacobian_determinant(zero.to_channel_first())?)?;
    assert_eq!(det.len(), 125);
    assert!(det.iter().all(|v| (v - 1.0).abs() < 1e-6));

    let scale = 1.1;
    let scaling = field_from_fn([6, 6, 6], SpatialMap::identity(), |p| {
        [
            (scale - 1.0) * p[0] as f64,
            (scale - 1.0) * p[1] as f64,
            (scale - 1.0) * p[2] as f64,
        ]
    });
    let map = JacobianFilter::new().apply(&scaling)?;
    assert_eq!(map.shape(), [5, 5, 5]);
    let summary = map.summary()?;
    assert!((summary.min - 1.331).abs() < 1e-4);
    assert!((summary.max - 1.331).abs() < 1e-4);
    assert!(!summary.has_folds());
    Ok(())
}

#[test]
fn test_warp_with_zero_field() -> Result<()> {
    let image = image_from_fn([9, 8, 7], SpatialMap::identity(), |[x, y, z]| {
        (x as f64 * 0.7).sin() + (y * z) as f64 * 0.1
    });
    let zero = DisplacementField::<Backend>::zeros([9, 8, 7], SpatialMap::identity(), &device());
    let original = to_host(image.data().clone())?;

    let nearest = to_host(warp(&image, &zero, Interpolation::Nearest)?.into_data())?;
    assert_eq!(nearest, original);

    let linear = to_host(warp(&image, &zero, Interpolation::Linear)?.into_data())?;
    for x in 1..8 {
        for y in 1..7 {
            for z in 1..6 {
                let n = flat_index([9, 8, 7], x, y, z);
                assert!((linear[n] - original[n]).abs() < 1e-5);
            }
        }
    }
    Ok(())
}

#[test]
fn test_warp_moves_impulse() -> Result<()> {
    let image = image_from_fn([10, 10, 10], SpatialMap::identity(), |p| {
        if p == [5, 5, 5] {
            1.0
        } else {
            0.0
        }
    });
    let shift = field_from_fn([10, 10, 10], SpatialMap::identity(), |_| [1.0, 0.0, 0.0]);

    for interpolation in [Interpolation::Nearest, Interpolation::Linear] {
        let warped = to_host(warp(&image, &shift, interpolation)?.into_data())?;
        let peak = flat_index([10, 10, 10], 4, 5, 5);
        assert!((warped[peak] - 1.0).abs() < 1e-6);
        assert!((warped.iter().sum::<f64>() - 1.0).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_double_inversion_recovers_field() -> Result<()> {
    let d = bump_field(20, 1.5);
    let recovered = invert(&invert(&d)?)?;
    let error = max_abs_diff(&to_host(recovered.into_data())?, &to_host(d.into_data())?);
    assert!(error < 0.5, "max round-trip error {}", error);
    Ok(())
}
