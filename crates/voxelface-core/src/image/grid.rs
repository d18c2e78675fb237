//! Sampling-grid model and index-grid generation.

use burn::tensor::{Tensor, TensorData, Shape};
use burn::tensor::backend::Backend;
use crate::spatial::{Point, Spacing, Direction};

/// The sampling geometry of a volume: voxel counts, spacing, origin and
/// orientation. Two volumes with equal grids sample the same physical
/// locations and can be composited voxel-by-voxel.
///
/// `size` is in tensor dimension order `[Z, Y, X]`; `origin`, `spacing` and
/// `direction` use physical component order `(x, y, z)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGrid<const D: usize> {
    pub size: [usize; D],
    pub origin: Point<D>,
    pub spacing: Spacing<D>,
    pub direction: Direction<D>,
}

impl<const D: usize> ImageGrid<D> {
    pub fn new(
        size: [usize; D],
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Self {
        Self {
            size,
            origin,
            spacing,
            direction,
        }
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Physical spacing along a tensor dimension (`size` order).
    pub fn axis_spacing(&self, tensor_dim: usize) -> f64 {
        self.spacing[D - 1 - tensor_dim]
    }

    /// Grid equality with exact sizes and epsilon comparison of the
    /// floating-point geometry.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        if self.size != other.size {
            return false;
        }
        for i in 0..D {
            if (self.origin[i] - other.origin[i]).abs() > tolerance {
                return false;
            }
            if (self.spacing[i] - other.spacing[i]).abs() > tolerance {
                return false;
            }
            for j in 0..D {
                if (self.direction[(i, j)] - other.direction[(i, j)]).abs() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// A grid with the given voxel counts covering the same physical extent
    /// as this one (spacing rescaled per axis, origin and orientation kept).
    pub fn with_size_preserving_extent(&self, size: [usize; D]) -> Self {
        let mut spacing = self.spacing;
        for dim in 0..D {
            let axis = D - 1 - dim;
            spacing[axis] =
                self.size[dim] as f64 * self.spacing[axis] / size[dim] as f64;
        }
        Self {
            size,
            origin: self.origin,
            spacing,
            direction: self.direction,
        }
    }

    /// Physical coordinate of the grid's continuous center index.
    pub fn physical_center(&self) -> Point<D> {
        let mut index = Point::<D>::origin();
        for dim in 0..D {
            index[D - 1 - dim] = (self.size[dim] as f64 - 1.0) / 2.0;
        }
        self.continuous_index_to_physical_point(&index)
    }

    /// Map a continuous index `(x, y, z)` to a physical point:
    /// `point = origin + direction * (index * spacing)`.
    pub fn continuous_index_to_physical_point(&self, index: &Point<D>) -> Point<D> {
        let mut scaled = crate::spatial::Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }

    /// Map a physical point to a continuous index:
    /// `index = direction^-1 * (point - origin) / spacing`.
    pub fn physical_point_to_continuous_index(&self, point: &Point<D>) -> Point<D> {
        let inv_dir = self
            .direction
            .try_inverse()
            .expect("direction matrix must be invertible");
        let rotated = inv_dir * (*point - self.origin);

        let mut index = Point::<D>::origin();
        for i in 0..D {
            index[i] = rotated[i] / self.spacing[i];
        }
        index
    }

    /// Batch map continuous indices `[N, D]` to physical points `[N, D]`.
    ///
    /// Row layout is `(x, y, z)` component order. The affine map is applied
    /// as `P = O + I @ M` with `M[r, c] = spacing[r] * direction[(c, r)]`.
    pub fn index_to_world_tensor<B: Backend>(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = indices.device();

        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(
            TensorData::new(origin_vec, Shape::new([D])),
            &device,
        )
        .reshape([1, D]);

        let mut m_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                m_data.push((self.spacing[r] * self.direction[(c, r)]) as f32);
            }
        }
        let m_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(m_data, Shape::new([D, D])),
            &device,
        );

        indices.matmul(m_tensor) + origin_tensor
    }

    /// Batch map physical points `[N, D]` to continuous indices `[N, D]`.
    ///
    /// The inverse of [`Self::index_to_world_tensor`]:
    /// `I = (P - O) @ T` with `T[r, c] = direction^-1[(c, r)] / spacing[c]`.
    pub fn world_to_index_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();

        let origin_vec: Vec<f32> = (0..D).map(|i| self.origin[i] as f32).collect();
        let origin_tensor = Tensor::<B, 1>::from_data(
            TensorData::new(origin_vec, Shape::new([D])),
            &device,
        )
        .reshape([1, D]);

        let inv_dir = self
            .direction
            .try_inverse()
            .expect("direction matrix must be invertible");

        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / self.spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(
            TensorData::new(t_data, Shape::new([D, D])),
            &device,
        );

        (points - origin_tensor).matmul(t_tensor)
    }
}

/// Generate the full grid of voxel indices for a shape, as a `[N, D]`
/// tensor of `(x, y, z)` components in scanline order (x fastest).
pub fn generate_grid<B: Backend, const D: usize>(
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, 2> {
    generate_grid_strided::<B, D>(shape, 1, device)
}

/// Generate every `stride`-th voxel index along each axis. `stride == 1`
/// yields the full grid; larger strides give a deterministic subset used
/// for metric sampling.
pub fn generate_grid_strided<B: Backend, const D: usize>(
    shape: [usize; D],
    stride: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    assert!(D == 3, "only 3-D index grids are supported");
    assert!(stride >= 1, "stride must be at least 1");

    let d = shape[0];
    let h = shape[1];
    let w = shape[2];

    let mut grid = Vec::new();
    for z in (0..d).step_by(stride) {
        for y in (0..h).step_by(stride) {
            for x in (0..w).step_by(stride) {
                grid.push(x as f32);
                grid.push(y as f32);
                grid.push(z as f32);
            }
        }
    }

    let total = grid.len() / D;
    Tensor::<B, 1>::from_data(TensorData::new(grid, Shape::new([total * D])), device)
        .reshape([total, D])
}
