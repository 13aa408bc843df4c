//! NIfTI reading and writing on top of the `nifti` crate.
//!
//! Stored volumes use the NIfTI axis convention `[X, Y, Z]` with an
//! optional trailing non-spatial axis `[X, Y, Z, C]`. In memory the
//! pipeline works on `[C, D, H, W]` tensors, so reading permutes to
//! `[Z, Y, X]` and moves the stored trailing axis to the front; 3-axis
//! files get a singleton channel axis inserted.

use burn::tensor::backend::Backend;
use burn::tensor::{Shape, Tensor, TensorData};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::Path;

use voxseg_core::error::{Result, SegmentationError};

/// Read a NIfTI file into a `[C, D, H, W]` float tensor.
pub fn read_volume<B: Backend, P: AsRef<Path>>(path: P, device: &B::Device) -> Result<Tensor<B, 4>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SegmentationError::missing_file(path));
    }

    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(|e| SegmentationError::nifti(format!("{}: {e}", path.display())))?;

    let array = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| SegmentationError::nifti(format!("{}: {e}", path.display())))?;

    // into_ndarray may hand back a non-contiguous view; raw-vec
    // extraction below requires standard layout.
    let array = array.as_standard_layout().into_owned();
    let dims = array.shape().to_vec();
    let data = array.into_raw_vec();

    tracing::debug!(path = %path.display(), shape = ?dims, "read NIfTI volume");

    match dims[..] {
        [x, y, z] => {
            let tensor = Tensor::<B, 3>::from_data(TensorData::new(data, Shape::new([x, y, z])), device);
            // [X, Y, Z] -> [Z, Y, X], then a singleton channel axis.
            Ok(tensor.permute([2, 1, 0]).unsqueeze::<4>())
        }
        [x, y, z, c] => {
            let tensor =
                Tensor::<B, 4>::from_data(TensorData::new(data, Shape::new([x, y, z, c])), device);
            // [X, Y, Z, C] -> [C, Z, Y, X].
            Ok(tensor.permute([3, 2, 1, 0]))
        }
        _ => Err(SegmentationError::nifti(format!(
            "{}: expected 3 or 4 axes, found {}",
            path.display(),
            dims.len()
        ))),
    }
}

/// Write a `[D, H, W]` float tensor as a NIfTI file.
///
/// The inverse of the read-side permutation: data is stored in the NIfTI
/// `[X, Y, Z]` convention. Used by fixture generation and tests; the
/// segmentation pipeline itself never serializes tensors.
pub fn write_volume<B: Backend, P: AsRef<Path>>(path: P, volume: &Tensor<B, 3>) -> Result<()> {
    use ndarray::Array3;
    use nifti::writer::WriterOptions;

    let [d, h, w] = volume.dims();
    let permuted = volume.clone().permute([2, 1, 0]);
    let data = permuted.into_data();
    let slice = data
        .as_slice::<f32>()
        .map_err(|e| SegmentationError::nifti(format!("failed to read tensor data: {e:?}")))?;

    let array = Array3::from_shape_vec((w, h, d), slice.to_vec())
        .map_err(|e| SegmentationError::nifti(format!("failed to shape ndarray: {e}")))?;

    WriterOptions::new(path.as_ref())
        .write_nifti(&array)
        .map_err(|e| SegmentationError::nifti(format!("{}: {e}", path.as_ref().display())))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use burn_ndarray::NdArray;
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_roundtrip_3d() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("volume.nii");
        let device = Default::default();

        let data: Vec<f32> = (0..3 * 4 * 5).map(|v| v as f32).collect();
        let volume = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(data.clone(), Shape::new([3, 4, 5])),
            &device,
        );

        write_volume(&file_path, &volume)?;
        let read = read_volume::<TestBackend, _>(&file_path, &device)?;

        // A singleton channel axis is inserted in front of [D, H, W].
        assert_eq!(read.dims(), [1, 3, 4, 5]);
        read.squeeze::<3>(0).into_data().assert_eq(&volume.into_data(), true);

        Ok(())
    }

    #[test]
    fn test_read_4d_maps_trailing_axis_to_channels() -> Result<()> {
        use ndarray::Array4;
        use nifti::writer::WriterOptions;

        let dir = tempdir()?;
        let file_path = dir.path().join("multichannel.nii");
        let device = Default::default();

        // Stored [X=5, Y=4, Z=3, C=2].
        let data: Vec<f32> = (0..5 * 4 * 3 * 2).map(|v| v as f32).collect();
        let array = Array4::from_shape_vec((5, 4, 3, 2), data)?;
        WriterOptions::new(&file_path).write_nifti(&array)?;

        let read = read_volume::<TestBackend, _>(&file_path, &device)?;
        assert_eq!(read.dims(), [2, 3, 4, 5]);

        Ok(())
    }

    #[test]
    fn test_read_missing_file() {
        let device = Default::default();
        let err = read_volume::<TestBackend, _>("/nonexistent/volume.nii.gz", &device).unwrap_err();
        assert!(matches!(err, SegmentationError::MissingFile { .. }));
    }
}
