//! Volume tensor operations shared by the data pipeline.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::{Result, SegmentationError};

/// Crop a `[C, D, H, W]` volume to a fixed spatial window.
///
/// The crop is anchored at index 0 on every trailing axis, so image and
/// mask crops taken with the same window cover identical index ranges.
/// Volumes smaller than the window on any spatial axis are rejected
/// instead of silently producing a short tensor.
pub fn crop_to_window<B: Backend>(
    volume: Tensor<B, 4>,
    window: [usize; 3],
) -> Result<Tensor<B, 4>> {
    let [_, d, h, w] = volume.dims();
    if d < window[0] || h < window[1] || w < window[2] {
        return Err(SegmentationError::UndersizedVolume {
            expected: window,
            actual: [d, h, w],
        });
    }
    Ok(volume
        .narrow(1, 0, window[0])
        .narrow(2, 0, window[1])
        .narrow(3, 0, window[2]))
}

/// Rescale a volume into [0, 1] using its own minimum and maximum.
///
/// Constant volumes pass through unchanged; there is nothing to scale
/// and dividing by the zero range would poison the tensor.
pub fn minmax_normalize<B: Backend>(volume: Tensor<B, 4>) -> Tensor<B, 4> {
    let min: f32 = volume.clone().min().into_scalar().elem();
    let max: f32 = volume.clone().max().into_scalar().elem();

    if max == min {
        tracing::debug!(value = min, "constant volume, skipping normalization");
        return volume;
    }

    (volume - min) / (max - min)
}
