//! Affine transform: linear map plus translation about a fixed center.

use burn::tensor::{Tensor, TensorData, Shape};
use burn::tensor::backend::Backend;
use nalgebra::{SMatrix, SVector};
use super::trait_::Transform;

/// Affine transform with a fixed center:
///
/// `T(x) = A(x - c) + c + t`
///
/// where `A` is a D×D linear map (rotation, scale, shear), `t` a translation
/// and `c` the fixed center of rotation/scaling. The transform is a plain
/// value; the registration optimizer produces new transforms instead of
/// mutating one.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: SVector<f64, D>,
    center: SVector<f64, D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create an affine transform from its linear part, translation and
    /// center, all in `(x, y, z)` component order.
    pub fn new(
        matrix: SMatrix<f64, D, D>,
        translation: SVector<f64, D>,
        center: SVector<f64, D>,
    ) -> Self {
        Self {
            matrix,
            translation,
            center,
        }
    }

    /// The identity transform about `center`.
    pub fn identity(center: SVector<f64, D>) -> Self {
        Self::new(SMatrix::identity(), SVector::zeros(), center)
    }

    /// The linear part `A`.
    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    /// The translation `t`.
    pub fn translation(&self) -> &SVector<f64, D> {
        &self.translation
    }

    /// The fixed center `c`.
    pub fn center(&self) -> &SVector<f64, D> {
        &self.center
    }

    /// The inverse transform, if `A` is invertible.
    ///
    /// With `y = A(x - c) + c + t`, the inverse about the same center is
    /// `x = A^-1(y - c) + c - A^-1 t`.
    pub fn try_inverse(&self) -> Option<Self> {
        let inv = self.matrix.try_inverse()?;
        Some(Self::new(inv, -(inv * self.translation), self.center))
    }

    /// Apply the transform to a single point.
    pub fn apply(&self, point: &SVector<f64, D>) -> SVector<f64, D> {
        self.matrix * (point - self.center) + self.center + self.translation
    }
}

impl AffineTransform<3> {
    /// Number of free parameters of a full 3-D affine transform.
    pub const NUM_PARAMETERS: usize = 12;

    /// Build a 3-D affine transform from 12 parameters about `center`:
    ///
    /// * `p[0..3]`  translation (mm)
    /// * `p[3..6]`  Euler rotation angles around x, y, z (radians)
    /// * `p[6..9]`  per-axis log-scale (0 = unit scale)
    /// * `p[9..12]` shear coefficients (xy, xz, yz)
    ///
    /// The linear part composes as `A = R * S * H` with `R = Rz Ry Rx`,
    /// `S = diag(exp(p6..p9))` and `H` unit upper-triangular. Log-scale
    /// keeps scale strictly positive for any parameter value, which keeps
    /// the optimizer's probes symmetric around identity.
    pub fn from_parameters(params: &[f64], center: SVector<f64, 3>) -> Self {
        assert_eq!(
            params.len(),
            Self::NUM_PARAMETERS,
            "expected {} affine parameters",
            Self::NUM_PARAMETERS
        );

        let translation = SVector::<f64, 3>::new(params[0], params[1], params[2]);

        let (sx, cx) = params[3].sin_cos();
        let (sy, cy) = params[4].sin_cos();
        let (sz, cz) = params[5].sin_cos();

        let rx = SMatrix::<f64, 3, 3>::new(
            1.0, 0.0, 0.0,
            0.0, cx, -sx,
            0.0, sx, cx,
        );
        let ry = SMatrix::<f64, 3, 3>::new(
            cy, 0.0, sy,
            0.0, 1.0, 0.0,
            -sy, 0.0, cy,
        );
        let rz = SMatrix::<f64, 3, 3>::new(
            cz, -sz, 0.0,
            sz, cz, 0.0,
            0.0, 0.0, 1.0,
        );
        let rotation = rz * ry * rx;

        let scale = SMatrix::<f64, 3, 3>::from_diagonal(&SVector::<f64, 3>::new(
            params[6].exp(),
            params[7].exp(),
            params[8].exp(),
        ));

        let shear = SMatrix::<f64, 3, 3>::new(
            1.0, params[9], params[10],
            0.0, 1.0, params[11],
            0.0, 0.0, 1.0,
        );

        Self::new(rotation * scale * shear, translation, center)
    }

    /// The parameter vector of the identity transform.
    pub fn identity_parameters() -> [f64; Self::NUM_PARAMETERS] {
        [0.0; Self::NUM_PARAMETERS]
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row-vector form of T(x) = A(x - c) + c + t:
        //   y = (x - c) @ A^T + (c + t)
        let device = points.device();

        let center_vec: Vec<f32> = (0..D).map(|i| self.center[i] as f32).collect();
        let center = Tensor::<B, 1>::from_data(
            TensorData::new(center_vec, Shape::new([D])),
            &device,
        )
        .reshape([1, D]);

        let offset_vec: Vec<f32> = (0..D)
            .map(|i| (self.center[i] + self.translation[i]) as f32)
            .collect();
        let offset = Tensor::<B, 1>::from_data(
            TensorData::new(offset_vec, Shape::new([D])),
            &device,
        )
        .reshape([1, D]);

        // A^T in row-major order: element (r, c) = A[(c, r)].
        let mut at_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                at_data.push(self.matrix[(c, r)] as f32);
            }
        }
        let a_t = Tensor::<B, 2>::from_data(
            TensorData::new(at_data, Shape::new([D, D])),
            &device,
        );

        (points - center).matmul(a_t) + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn test_identity_transform_points() {
        let device = Default::default();
        let transform = AffineTransform::<3>::identity(SVector::zeros());

        let points = Tensor::<B, 2>::from_floats([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]], &device);
        let out = Transform::<B, 3>::transform_points(&transform, points);

        let data = out.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert_eq!(slice, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_translation_about_center() {
        let device = Default::default();
        let transform = AffineTransform::<3>::new(
            SMatrix::identity(),
            SVector::<f64, 3>::new(1.0, -2.0, 0.5),
            SVector::<f64, 3>::new(10.0, 10.0, 10.0),
        );

        let points = Tensor::<B, 2>::from_floats([[10.0, 10.0, 10.0]], &device);
        let out = Transform::<B, 3>::transform_points(&transform, points);
        let data = out.into_data();
        let slice = data.as_slice::<f32>().unwrap();
        assert!((slice[0] - 11.0).abs() < 1e-6);
        assert!((slice[1] - 8.0).abs() < 1e-6);
        assert!((slice[2] - 10.5).abs() < 1e-6);
    }

    #[test]
    fn test_scale_about_center() {
        // Scale by 2 about (1, 1, 1): the point (2, 1, 1) maps to (3, 1, 1).
        let mut params = AffineTransform::<3>::identity_parameters();
        params[6] = 2.0f64.ln();
        params[7] = 2.0f64.ln();
        params[8] = 2.0f64.ln();
        let transform =
            AffineTransform::<3>::from_parameters(&params, SVector::<f64, 3>::new(1.0, 1.0, 1.0));

        let out = transform.apply(&SVector::<f64, 3>::new(2.0, 1.0, 1.0));
        assert!((out[0] - 3.0).abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!((out[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_parameters() {
        // 90 degrees around z maps +x to +y.
        let mut params = AffineTransform::<3>::identity_parameters();
        params[5] = std::f64::consts::FRAC_PI_2;
        let transform = AffineTransform::<3>::from_parameters(&params, SVector::zeros());

        let out = transform.apply(&SVector::<f64, 3>::new(1.0, 0.0, 0.0));
        assert!(out[0].abs() < 1e-12);
        assert!((out[1] - 1.0).abs() < 1e-12);
        assert!(out[2].abs() < 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let mut params = AffineTransform::<3>::identity_parameters();
        params[0] = 3.0;
        params[1] = -1.0;
        params[5] = 0.3;
        params[6] = 0.1;
        params[9] = 0.05;
        let transform =
            AffineTransform::<3>::from_parameters(&params, SVector::<f64, 3>::new(5.0, 5.0, 5.0));
        let inverse = transform.try_inverse().unwrap();

        let p = SVector::<f64, 3>::new(1.5, 2.5, -0.5);
        let roundtrip = inverse.apply(&transform.apply(&p));
        for i in 0..3 {
            assert!((roundtrip[i] - p[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_identity_parameters_give_identity() {
        let params = AffineTransform::<3>::identity_parameters();
        let transform = AffineTransform::<3>::from_parameters(&params, SVector::zeros());
        assert_eq!(transform.matrix(), &SMatrix::<f64, 3, 3>::identity());
        assert_eq!(transform.translation(), &SVector::<f64, 3>::zeros());
    }
}
