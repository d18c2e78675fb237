//! Cubic B-spline interpolation.

use burn::tensor::{Tensor, TensorData, Shape};
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use super::trait_::Interpolator;

/// Cubic B-spline kernel:
///
/// * `(2/3) - |u|^2 + (1/2)|u|^3`  for `|u| < 1`
/// * `(1/6)(2 - |u|)^3`            for `1 <= |u| < 2`
/// * `0`                           otherwise
#[inline]
fn cubic_bspline(u: f32) -> f32 {
    let a = u.abs();
    if a < 1.0 {
        (2.0 / 3.0) - a * a + 0.5 * a * a * a
    } else if a < 2.0 {
        let b = 2.0 - a;
        (1.0 / 6.0) * b * b * b
    } else {
        0.0
    }
}

/// Cubic B-spline interpolator.
///
/// Smooth continuous sampling over a 4×4×4 neighborhood, used for the
/// voxelator's downsampling step where graceful degradation matters more
/// than exact interpolation. Samples are independent per output voxel, so
/// the batch is evaluated in parallel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BSplineInterpolator;

impl BSplineInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for BSplineInterpolator {
    fn interpolate<const D: usize>(
        &self,
        data: &Tensor<B, D>,
        indices: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        assert!(D == 3, "B-spline interpolation supports 3-D volumes only");

        let device = indices.device();
        let shape = data.shape();
        let d0 = shape.dims[0]; // Z
        let d1 = shape.dims[1]; // Y
        let d2 = shape.dims[2]; // X
        let n = indices.dims()[0];

        let src_data = data.to_data();
        let src = src_data.as_slice::<f32>().expect("volume data must be f32");
        let idx_data = indices.into_data();
        let pts = idx_data.as_slice::<f32>().expect("indices must be f32");

        let values: Vec<f32> = (0..n)
            .into_par_iter()
            .map(|i| sample_point(src, [d0, d1, d2], pts[i * 3], pts[i * 3 + 1], pts[i * 3 + 2]))
            .collect();

        Tensor::<B, 1>::from_data(TensorData::new(values, Shape::new([n])), &device)
    }
}

/// Evaluate the kernel over the 4×4×4 support around (x, y, z).
///
/// Taps outside the volume are skipped and the remaining weights
/// renormalized, which keeps edge samples in the source intensity range.
fn sample_point(src: &[f32], dims: [usize; 3], x: f32, y: f32, z: f32) -> f32 {
    let x0 = x.floor() as isize - 1;
    let y0 = y.floor() as isize - 1;
    let z0 = z.floor() as isize - 1;

    let mut accum = 0.0f32;
    let mut weight_sum = 0.0f32;

    for dz in 0..4 {
        let zi = z0 + dz;
        if zi < 0 || zi >= dims[0] as isize {
            continue;
        }
        let wz = cubic_bspline(z - zi as f32);
        for dy in 0..4 {
            let yi = y0 + dy;
            if yi < 0 || yi >= dims[1] as isize {
                continue;
            }
            let wy = cubic_bspline(y - yi as f32);
            for dx in 0..4 {
                let xi = x0 + dx;
                if xi < 0 || xi >= dims[2] as isize {
                    continue;
                }
                let wx = cubic_bspline(x - xi as f32);
                let w = wx * wy * wz;
                let flat = zi as usize * dims[1] * dims[2] + yi as usize * dims[2] + xi as usize;
                accum += src[flat] * w;
                weight_sum += w;
            }
        }
    }

    if weight_sum > 0.0 {
        accum / weight_sum
    } else {
        0.0
    }
}
