//! Volume type: tensor voxel data plus physical-space metadata.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use crate::error::{ImageError, Result};
use crate::image::grid::ImageGrid;
use crate::spatial::{Point, Spacing, Direction};

/// A scalar volume with physical metadata.
///
/// Voxel data lives in a `Tensor<B, D>` with dimensions ordered `[Z, Y, X]`;
/// `origin`, `spacing` and `direction` use `(x, y, z)` component order. The
/// index-to-physical mapping is
/// `point = origin + direction * (index * spacing)`.
///
/// Volumes are immutable by convention: filters never write into an input,
/// they return new `Image` values.
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image from voxel data and metadata.
    pub fn new(
        data: Tensor<B, D>,
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            data,
            origin,
            spacing,
            direction,
        }
    }

    /// Create an image holding `data` sampled on `grid`.
    pub fn from_grid(data: Tensor<B, D>, grid: &ImageGrid<D>) -> Self {
        Self::new(data, grid.origin, grid.spacing, grid.direction)
    }

    /// The voxel data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Physical coordinate of voxel (0, 0, 0).
    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    /// Physical distance between adjacent voxels, `(x, y, z)`.
    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    /// Orientation of the image axes.
    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    /// Voxel counts in tensor order `[Z, Y, X]`.
    pub fn shape(&self) -> [usize; D] {
        self.data
            .shape()
            .dims
            .try_into()
            .expect("tensor rank mismatch")
    }

    /// The sampling grid this volume is registered on.
    pub fn grid(&self) -> ImageGrid<D> {
        ImageGrid::new(self.shape(), self.origin, self.spacing, self.direction)
    }

    /// Physical coordinate of the volume's center.
    pub fn physical_center(&self) -> Point<D> {
        self.grid().physical_center()
    }

    /// Check that this volume's geometry is usable for resampling and
    /// registration: non-empty dimensions, positive finite spacing, an
    /// invertible direction matrix, and a finite origin.
    pub fn validate_geometry(&self) -> Result<()>
    where
        nalgebra::Const<D>: nalgebra::DimMin<nalgebra::Const<D>, Output = nalgebra::Const<D>>,
    {
        let shape = self.shape();
        if shape.iter().any(|&s| s == 0) {
            return Err(ImageError::invalid_geometry(format!(
                "volume has an empty dimension: {:?}",
                shape
            )));
        }
        if !self.spacing.is_valid() {
            return Err(ImageError::invalid_geometry(format!(
                "voxel spacing must be positive and finite, got {:?}",
                self.spacing.to_vec()
            )));
        }
        if !self.direction.is_valid() {
            return Err(ImageError::invalid_geometry(
                "direction matrix is singular or non-finite",
            ));
        }
        if (0..D).any(|i| !self.origin[i].is_finite()) {
            return Err(ImageError::invalid_geometry(format!(
                "origin must be finite, got {:?}",
                self.origin.to_vec()
            )));
        }
        Ok(())
    }

    /// Map a physical point to a continuous index.
    pub fn transform_physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        self.grid().physical_point_to_continuous_index(point)
    }

    /// Map a continuous index to a physical point.
    pub fn transform_continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        self.grid().continuous_index_to_physical_point(index)
    }

    /// Batch map continuous indices `[N, D]` to physical points.
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        self.grid().index_to_world_tensor(indices)
    }

    /// Batch map physical points `[N, D]` to continuous indices.
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        self.grid().world_to_index_tensor(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;
    type Point3 = Point<3>;
    type Spacing3 = Spacing<3>;
    type Direction3 = Direction<3>;

    fn make_image(shape: [usize; 3], spacing: [f64; 3]) -> Image<B, 3> {
        let device = Default::default();
        let data = Tensor::<B, 3>::zeros(shape, &device);
        Image::new(
            data,
            Point3::origin(),
            Spacing3::new(spacing),
            Direction3::identity(),
        )
    }

    #[test]
    fn test_image_accessors() {
        let image = make_image([10, 12, 14], [1.0, 1.0, 1.0]);
        assert_eq!(image.shape(), [10, 12, 14]);
        assert_eq!(image.grid().size, [10, 12, 14]);
    }

    #[test]
    fn test_point_roundtrip() {
        let image = make_image([10, 10, 10], [2.0, 2.0, 2.0]);
        let point = Point3::new([7.0, 5.0, 3.0]);
        let index = image.transform_physical_point_to_continuous_index(&point);
        let back = image.transform_continuous_index_to_physical_point(&index);
        for i in 0..3 {
            assert!((point[i] - back[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_validate_geometry_accepts_sane_volume() {
        assert!(make_image([4, 4, 4], [1.0, 1.0, 1.2]).validate_geometry().is_ok());
    }

    #[test]
    fn test_validate_geometry_rejects_zero_spacing() {
        let err = make_image([4, 4, 4], [1.0, 0.0, 1.0])
            .validate_geometry()
            .unwrap_err();
        assert!(matches!(err, ImageError::InvalidInputGeometry(_)));
    }

    #[test]
    fn test_validate_geometry_rejects_singular_direction() {
        let mut image = make_image([4, 4, 4], [1.0, 1.0, 1.0]);
        let mut dir = Direction3::identity();
        dir[(1, 1)] = 0.0;
        image = Image::new(image.data().clone(), *image.origin(), *image.spacing(), dir);
        assert!(image.validate_geometry().is_err());
    }

    #[test]
    fn test_physical_center_with_offset_origin() {
        let device = Default::default();
        let data = Tensor::<B, 3>::zeros([5, 5, 5], &device);
        let image = Image::new(
            data,
            Point3::new([10.0, 20.0, 30.0]),
            Spacing3::uniform(2.0),
            Direction3::identity(),
        );
        let c = image.physical_center();
        assert_eq!(c, Point3::new([14.0, 24.0, 34.0]));
    }
}
