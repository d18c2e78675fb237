//! NIfTI volume reading and writing.
//!
//! Disk layout is NIfTI's `[X, Y, Z]` with x fastest; in memory volumes use
//! the `[Z, Y, X]` tensor convention, so both directions permute the axes.
//! The voxel-to-world affine comes from the sform when present, the qform
//! as fallback, and bare pixdim scaling as a last resort.

use std::path::Path;
use burn::tensor::{Tensor, TensorData, Shape};
use burn::tensor::backend::Backend;
use nalgebra::SMatrix;
use ndarray::Array3;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use nifti::writer::WriterOptions;
use voxelface_core::image::Image;
use voxelface_core::spatial::{Point, Spacing, Direction, Vector};
use crate::error::{IoError, Result};

/// Read a 3-D scalar volume from a NIfTI file.
pub fn read_nifti<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Image<B, 3>> {
    let object = ReaderOptions::new().read_file(path.as_ref())?;
    let header = object.header();
    let affine = voxel_affine(header);

    let m00 = affine[0][0] as f64;
    let m01 = affine[0][1] as f64;
    let m02 = affine[0][2] as f64;
    let m10 = affine[1][0] as f64;
    let m11 = affine[1][1] as f64;
    let m12 = affine[1][2] as f64;
    let m20 = affine[2][0] as f64;
    let m21 = affine[2][1] as f64;
    let m22 = affine[2][2] as f64;

    let origin = Point::new([affine[0][3] as f64, affine[1][3] as f64, affine[2][3] as f64]);

    // Columns carry axis direction scaled by spacing.
    let col0 = Vector::new([m00, m10, m20]);
    let col1 = Vector::new([m01, m11, m21]);
    let col2 = Vector::new([m02, m12, m22]);

    let sp0 = col0.inner().norm();
    let sp1 = col1.inner().norm();
    let sp2 = col2.inner().norm();
    let spacing = Spacing::new([sp0, sp1, sp2]);

    let d0 = if sp0 > 1e-9 {
        col0.inner() / sp0
    } else {
        nalgebra::Vector3::x_axis().into_inner()
    };
    let d1 = if sp1 > 1e-9 {
        col1.inner() / sp1
    } else {
        nalgebra::Vector3::y_axis().into_inner()
    };
    let d2 = if sp2 > 1e-9 {
        col2.inner() / sp2
    } else {
        nalgebra::Vector3::z_axis().into_inner()
    };
    let direction = Direction(SMatrix::<f64, 3, 3>::from_columns(&[d0, d1, d2]));

    let array = object.into_volume().into_ndarray::<f32>()?;
    let dims = array.shape().to_vec();
    if dims.len() != 3 {
        return Err(IoError::UnsupportedDimensionality(dims.len()));
    }
    let (nx, ny, nz) = (dims[0], dims[1], dims[2]);

    // Iterating in logical order makes the copy independent of the array's
    // memory layout.
    let data: Vec<f32> = array.iter().copied().collect();
    let tensor =
        Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([nx, ny, nz])), device)
            .permute([2, 1, 0]);

    Ok(Image::new(tensor, origin, spacing, direction))
}

/// Write a 3-D scalar volume to a NIfTI file, preserving its grid geometry
/// in the header's sform.
pub fn write_nifti<B: Backend, P: AsRef<Path>>(path: P, image: &Image<B, 3>) -> Result<()> {
    let shape = image.shape();
    let (nz, ny, nx) = (shape[0], shape[1], shape[2]);

    let tensor = image.data().clone().permute([2, 1, 0]);
    let data = tensor.into_data();
    let slice = data
        .as_slice::<f32>()
        .map_err(|e| IoError::Write(format!("tensor data is not f32: {:?}", e)))?;
    let array = Array3::from_shape_vec((nx, ny, nz), slice.to_vec())
        .map_err(|e| IoError::Write(e.to_string()))?;

    let header = build_header(image);
    WriterOptions::new(path.as_ref())
        .reference_header(&header)
        .write_nifti(&array)?;
    Ok(())
}

/// The voxel-to-world affine of a header as rows, sform over qform over
/// bare pixdim scaling.
fn voxel_affine(header: &NiftiHeader) -> [[f32; 4]; 4] {
    if header.sform_code > 0 {
        return [
            header.srow_x,
            header.srow_y,
            header.srow_z,
            [0.0, 0.0, 0.0, 1.0],
        ];
    }

    if header.qform_code > 0 {
        let b = header.quatern_b;
        let c = header.quatern_c;
        let d = header.quatern_d;
        let a = (1.0 - (b * b + c * c + d * d).min(1.0)).sqrt();
        let qfac = if header.pixdim[0] == 0.0 { 1.0 } else { header.pixdim[0] };

        let dx = header.pixdim[1];
        let dy = header.pixdim[2];
        let dz = header.pixdim[3] * qfac;

        return [
            [
                (a * a + b * b - c * c - d * d) * dx,
                (2.0 * b * c - 2.0 * a * d) * dy,
                (2.0 * b * d + 2.0 * a * c) * dz,
                header.quatern_x,
            ],
            [
                (2.0 * b * c + 2.0 * a * d) * dx,
                (a * a + c * c - b * b - d * d) * dy,
                (2.0 * c * d - 2.0 * a * b) * dz,
                header.quatern_y,
            ],
            [
                (2.0 * b * d - 2.0 * a * c) * dx,
                (2.0 * c * d + 2.0 * a * b) * dy,
                (a * a + d * d - c * c - b * b) * dz,
                header.quatern_z,
            ],
            [0.0, 0.0, 0.0, 1.0],
        ];
    }

    [
        [header.pixdim[1], 0.0, 0.0, 0.0],
        [0.0, header.pixdim[2], 0.0, 0.0],
        [0.0, 0.0, header.pixdim[3], 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// A header carrying the image's grid as an sform.
fn build_header<B: Backend>(image: &Image<B, 3>) -> NiftiHeader {
    let shape = image.shape();
    let spacing = image.spacing();
    let direction = image.direction();
    let origin = image.origin();

    let mut header = NiftiHeader::default();
    header.dim = [
        3,
        shape[2] as u16,
        shape[1] as u16,
        shape[0] as u16,
        1,
        1,
        1,
        1,
    ];
    header.pixdim = [
        1.0,
        spacing[0] as f32,
        spacing[1] as f32,
        spacing[2] as f32,
        1.0,
        1.0,
        1.0,
        1.0,
    ];
    header.datatype = 16; // float32
    header.bitpix = 32;
    header.sform_code = 1;
    header.qform_code = 0;
    header.srow_x = [
        (direction[(0, 0)] * spacing[0]) as f32,
        (direction[(0, 1)] * spacing[1]) as f32,
        (direction[(0, 2)] * spacing[2]) as f32,
        origin[0] as f32,
    ];
    header.srow_y = [
        (direction[(1, 0)] * spacing[0]) as f32,
        (direction[(1, 1)] * spacing[1]) as f32,
        (direction[(1, 2)] * spacing[2]) as f32,
        origin[1] as f32,
    ];
    header.srow_z = [
        (direction[(2, 0)] * spacing[0]) as f32,
        (direction[(2, 1)] * spacing[1]) as f32,
        (direction[(2, 2)] * spacing[2]) as f32,
        origin[2] as f32,
    ];
    header
}
