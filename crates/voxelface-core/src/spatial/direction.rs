//! Direction matrix: orientation of image axes in physical space.

use nalgebra::SMatrix;
use super::Vector;

/// D×D direction cosine matrix; column i is the physical direction of the
/// i-th image axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Identity orientation (axis-aligned).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Try to invert the direction matrix. `None` for singular matrices.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Determinant of the direction matrix.
    pub fn determinant(&self) -> f64
    where
        nalgebra::Const<D>: nalgebra::DimMin<nalgebra::Const<D>, Output = nalgebra::Const<D>>,
    {
        self.0.determinant()
    }

    /// True when all entries are finite and the matrix is invertible.
    pub fn is_valid(&self) -> bool
    where
        nalgebra::Const<D>: nalgebra::DimMin<nalgebra::Const<D>, Output = nalgebra::Const<D>>,
    {
        self.0.iter().all(|v| v.is_finite()) && self.determinant().abs() > 1e-12
    }

    /// The inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Direction3 = Direction<3>;
    type Vector3 = Vector<3>;

    #[test]
    fn test_identity() {
        let d = Direction3::identity();
        assert_eq!(d[(0, 0)], 1.0);
        assert_eq!(d[(0, 1)], 0.0);
        assert_eq!(d * Vector3::new([1.0, 2.0, 3.0]), Vector3::new([1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_is_valid() {
        assert!(Direction3::identity().is_valid());

        let mut singular = Direction3::identity();
        singular[(2, 2)] = 0.0;
        assert!(!singular.is_valid());
    }

    #[test]
    fn test_inverse_of_rotation() {
        // 90 degrees around Z
        let mut rot = Direction3::identity();
        rot[(0, 0)] = 0.0;
        rot[(0, 1)] = -1.0;
        rot[(1, 0)] = 1.0;
        rot[(1, 1)] = 0.0;

        let inv = rot.try_inverse().unwrap();
        let v = inv * (rot * Vector3::new([1.0, 2.0, 3.0]));
        assert!((v[0] - 1.0).abs() < 1e-12);
        assert!((v[1] - 2.0).abs() < 1e-12);
        assert!((v[2] - 3.0).abs() < 1e-12);
    }
}
