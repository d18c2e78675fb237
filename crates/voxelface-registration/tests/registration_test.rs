//! End-to-end estimator tests on synthetic volumes.

use burn::tensor::{Tensor, TensorData, Shape};
use burn_ndarray::NdArray;
use voxelface_core::image::Image;
use voxelface_core::spatial::{Direction, Point, Spacing};
use voxelface_registration::{
    AffineRegistration, NormalizedCrossCorrelation, RegistrationError, RegistrationSchedule,
    TransformModel,
};

type B = NdArray<f32>;

/// A smooth Gaussian blob centered at `center` (x, y, z voxel coordinates).
fn blob_image(shape: [usize; 3], center: [f64; 3], sigma: f64, spacing: [f64; 3]) -> Image<B, 3> {
    let device = Default::default();
    let mut data = Vec::with_capacity(shape.iter().product());
    for z in 0..shape[0] {
        for y in 0..shape[1] {
            for x in 0..shape[2] {
                let dx = x as f64 - center[0];
                let dy = y as f64 - center[1];
                let dz = z as f64 - center[2];
                let d2 = dx * dx + dy * dy + dz * dz;
                data.push((-d2 / (2.0 * sigma * sigma)).exp() as f32);
            }
        }
    }
    let tensor = Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new(shape)), &device);
    Image::new(
        tensor,
        Point::origin(),
        Spacing::new(spacing),
        Direction::identity(),
    )
}

#[test]
fn recovers_a_known_translation() {
    let fixed = blob_image([20, 20, 20], [10.0, 10.0, 10.0], 4.0, [1.0, 1.0, 1.0]);
    let moving = blob_image([20, 20, 20], [12.0, 9.0, 10.0], 4.0, [1.0, 1.0, 1.0]);

    let schedule = RegistrationSchedule::levels(2)
        .with_sample_strides(vec![1, 1])
        .with_iterations(vec![60, 60]);
    let registration = AffineRegistration::new(NormalizedCrossCorrelation::new())
        .with_model(TransformModel::Translation)
        .with_schedule(schedule);

    let transform = registration.execute(&fixed, &moving).unwrap();

    // The fixed-to-moving map must carry the fixed blob onto the moving one.
    let t = transform.translation();
    assert!((t[0] - 2.0).abs() < 0.5, "tx = {}", t[0]);
    assert!((t[1] + 1.0).abs() < 0.5, "ty = {}", t[1]);
    assert!(t[2].abs() < 0.5, "tz = {}", t[2]);
}

#[test]
fn compensates_an_origin_offset_between_volumes() {
    // Same anatomy, but the moving volume's world origin is shifted; the
    // center-aligned seed must absorb the offset and the optimizer keep it.
    let fixed = blob_image([16, 16, 16], [8.0, 8.0, 8.0], 3.0, [1.0, 1.0, 1.0]);
    let mut moving = blob_image([16, 16, 16], [8.0, 8.0, 8.0], 3.0, [1.0, 1.0, 1.0]);
    moving = Image::new(
        moving.data().clone(),
        Point::new([50.0, 0.0, 0.0]),
        *moving.spacing(),
        *moving.direction(),
    );

    let schedule = RegistrationSchedule::levels(2)
        .with_sample_strides(vec![1, 1])
        .with_iterations(vec![40, 40]);
    let registration = AffineRegistration::new(NormalizedCrossCorrelation::new())
        .with_model(TransformModel::Translation)
        .with_schedule(schedule);

    let transform = registration.execute(&fixed, &moving).unwrap();
    let t = transform.translation();
    assert!((t[0] - 50.0).abs() < 0.5, "tx = {}", t[0]);
    assert!(t[1].abs() < 0.5, "ty = {}", t[1]);
    assert!(t[2].abs() < 0.5, "tz = {}", t[2]);
}

#[test]
fn zero_spacing_fails_before_any_optimization() {
    let fixed = blob_image([8, 8, 8], [4.0, 4.0, 4.0], 2.0, [1.0, 0.0, 1.0]);
    let moving = blob_image([8, 8, 8], [4.0, 4.0, 4.0], 2.0, [1.0, 1.0, 1.0]);

    let registration = AffineRegistration::new(NormalizedCrossCorrelation::new());
    let err = registration.execute(&fixed, &moving).unwrap_err();
    assert!(matches!(err, RegistrationError::InvalidInputGeometry(_)));
}

#[test]
fn featureless_volumes_cannot_satisfy_a_required_improvement() {
    // Flat images give the optimizer nothing to improve on; requiring a
    // strict improvement over identity must then report divergence instead
    // of silently accepting the seed transform.
    let device = Default::default();
    let flat = Image::<B, 3>::new(
        Tensor::ones([12, 12, 12], &device),
        Point::origin(),
        Spacing::uniform(1.0),
        Direction::identity(),
    );

    let schedule = RegistrationSchedule::levels(2)
        .with_sample_strides(vec![1, 1])
        .with_iterations(vec![10, 10]);
    let registration = AffineRegistration::new(NormalizedCrossCorrelation::new())
        .with_schedule(schedule)
        .with_model(TransformModel::Translation)
        .with_divergence_tolerance(-0.5);

    let err = registration.execute(&flat, &flat).unwrap_err();
    assert!(matches!(err, RegistrationError::Divergence(_)));
}

#[test]
fn expired_timeout_is_reported() {
    let fixed = blob_image([12, 12, 12], [6.0, 6.0, 6.0], 3.0, [1.0, 1.0, 1.0]);
    let moving = blob_image([12, 12, 12], [7.0, 6.0, 6.0], 3.0, [1.0, 1.0, 1.0]);

    let registration = AffineRegistration::new(NormalizedCrossCorrelation::new())
        .with_model(TransformModel::Translation)
        .with_timeout(std::time::Duration::ZERO);

    let err = registration.execute(&fixed, &moving).unwrap_err();
    assert!(matches!(err, RegistrationError::Timeout(_)));
}
