//! Resampling primitives used by augmentation.
//!
//! Rotation and zoom share one structure: the input volume is sampled on
//! the output voxel grid through a coordinate mapping, with source
//! coordinates clamped to the valid range at the borders. Neighbor
//! values are collected with `select` on (flattened) axes and blended
//! with precomputed weights, which keeps both float volumes and integer
//! label volumes inside the tensor domain.
//!
//! Label volumes must always be sampled with [`rotate_hw_labels`] /
//! [`zoom_labels`]: nearest-neighbor lookup is the only order that
//! preserves class identity, since blending integer labels invents
//! classes that do not exist.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Shape, Tensor, TensorData};

/// Interpolation order used when sampling off-grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Bilinear/trilinear blending of the surrounding grid values.
    Linear,
    /// Value of the closest grid point.
    Nearest,
}

/// Rotate a `[C, D, H, W]` volume in the (H, W) plane around its center.
///
/// The output grid equals the input grid; coordinates that rotate out of
/// the volume are clamped to the nearest edge voxel.
pub fn rotate_hw<B: Backend>(
    volume: Tensor<B, 4>,
    angle_deg: f64,
    interpolation: Interpolation,
) -> Tensor<B, 4> {
    let [c, d, h, w] = volume.dims();
    let device = volume.device();
    let coords = plane_rotation_coords(h, w, angle_deg);
    let flat = volume.reshape([c, d, h * w]);

    let resampled = match interpolation {
        Interpolation::Nearest => {
            let idx = nearest_flat_indices(&coords, h, w);
            flat.select(2, index_tensor::<B>(idx, &device))
        }
        Interpolation::Linear => {
            let [c00, c01, c10, c11] = bilinear_corners(&coords, h, w);
            gather_weighted(&flat, c00, &device)
                + gather_weighted(&flat, c01, &device)
                + gather_weighted(&flat, c10, &device)
                + gather_weighted(&flat, c11, &device)
        }
    };

    resampled.reshape([c, d, h, w])
}

/// Rotate a `[C, D, H, W]` label volume in the (H, W) plane.
///
/// Nearest-neighbor only, so every output voxel carries one of the input
/// labels.
pub fn rotate_hw_labels<B: Backend>(labels: Tensor<B, 4, Int>, angle_deg: f64) -> Tensor<B, 4, Int> {
    let [c, d, h, w] = labels.dims();
    let device = labels.device();
    let coords = plane_rotation_coords(h, w, angle_deg);
    let idx = nearest_flat_indices(&coords, h, w);
    labels
        .reshape([c, d, h * w])
        .select(2, index_tensor::<B>(idx, &device))
        .reshape([c, d, h, w])
}

/// Zoom a `[C, D, H, W]` volume by one factor on all three spatial axes.
///
/// The output grid equals the input grid: output voxel `i` samples
/// source coordinate `i / factor`, clamped to the volume. Factors above
/// 1 magnify the low-index corner; factors below 1 shrink the content
/// and the clamped border repeats the last row of voxels.
pub fn zoom<B: Backend>(
    volume: Tensor<B, 4>,
    factor: f64,
    interpolation: Interpolation,
) -> Tensor<B, 4> {
    let mut out = volume;
    for dim in 1..4 {
        out = zoom_axis(out, dim, factor, interpolation);
    }
    out
}

/// Zoom a `[C, D, H, W]` label volume, nearest-neighbor on every axis.
pub fn zoom_labels<B: Backend>(labels: Tensor<B, 4, Int>, factor: f64) -> Tensor<B, 4, Int> {
    let mut out = labels;
    for dim in 1..4 {
        let len = out.dims()[dim];
        let device = out.device();
        let idx = axis_zoom_coords(len, factor)
            .into_iter()
            .map(|s| s.round() as i64)
            .collect();
        out = out.select(dim, index_tensor::<B>(idx, &device));
    }
    out
}

fn zoom_axis<B: Backend>(
    volume: Tensor<B, 4>,
    dim: usize,
    factor: f64,
    interpolation: Interpolation,
) -> Tensor<B, 4> {
    let len = volume.dims()[dim];
    let device = volume.device();
    let coords = axis_zoom_coords(len, factor);

    match interpolation {
        Interpolation::Nearest => {
            let idx = coords.into_iter().map(|s| s.round() as i64).collect();
            volume.select(dim, index_tensor::<B>(idx, &device))
        }
        Interpolation::Linear => {
            let max = (len - 1) as i64;
            let mut lo_idx = Vec::with_capacity(len);
            let mut hi_idx = Vec::with_capacity(len);
            let mut lo_weight = Vec::with_capacity(len);
            let mut hi_weight = Vec::with_capacity(len);
            for s in coords {
                let floor = s.floor();
                let t = (s - floor) as f32;
                lo_idx.push((floor as i64).clamp(0, max));
                hi_idx.push((floor as i64 + 1).clamp(0, max));
                lo_weight.push(1.0 - t);
                hi_weight.push(t);
            }

            let mut weight_shape = [1usize; 4];
            weight_shape[dim] = len;
            let lo = volume.clone().select(dim, index_tensor::<B>(lo_idx, &device))
                * weight_tensor::<B>(lo_weight, &device).reshape(weight_shape);
            let hi = volume.select(dim, index_tensor::<B>(hi_idx, &device))
                * weight_tensor::<B>(hi_weight, &device).reshape(weight_shape);
            lo + hi
        }
    }
}

/// Source coordinates for rotating the (H, W) plane by `angle_deg`
/// around its center, enumerated in output row-major (y, x) order.
fn plane_rotation_coords(h: usize, w: usize, angle_deg: f64) -> Vec<(f64, f64)> {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let cy = (h as f64 - 1.0) / 2.0;
    let cx = (w as f64 - 1.0) / 2.0;

    let mut coords = Vec::with_capacity(h * w);
    for y in 0..h {
        for x in 0..w {
            let dy = y as f64 - cy;
            let dx = x as f64 - cx;
            coords.push((cy + dy * cos - dx * sin, cx + dy * sin + dx * cos));
        }
    }
    coords
}

fn axis_zoom_coords(len: usize, factor: f64) -> Vec<f64> {
    let max = (len - 1) as f64;
    (0..len).map(|i| (i as f64 / factor).min(max)).collect()
}

fn nearest_flat_indices(coords: &[(f64, f64)], h: usize, w: usize) -> Vec<i64> {
    let max_y = (h - 1) as i64;
    let max_x = (w - 1) as i64;
    coords
        .iter()
        .map(|&(sy, sx)| {
            let iy = (sy.round() as i64).clamp(0, max_y);
            let ix = (sx.round() as i64).clamp(0, max_x);
            iy * w as i64 + ix
        })
        .collect()
}

/// One bilinear corner: flat gather indices plus blending weights.
struct Corner {
    idx: Vec<i64>,
    weight: Vec<f32>,
}

fn bilinear_corners(coords: &[(f64, f64)], h: usize, w: usize) -> [Corner; 4] {
    let max_y = (h - 1) as i64;
    let max_x = (w - 1) as i64;
    let n = coords.len();
    let mut corners = [
        Corner { idx: Vec::with_capacity(n), weight: Vec::with_capacity(n) },
        Corner { idx: Vec::with_capacity(n), weight: Vec::with_capacity(n) },
        Corner { idx: Vec::with_capacity(n), weight: Vec::with_capacity(n) },
        Corner { idx: Vec::with_capacity(n), weight: Vec::with_capacity(n) },
    ];

    for &(sy, sx) in coords {
        let y_floor = sy.floor();
        let x_floor = sx.floor();
        // Weights come from the unclamped fractional part; at the border
        // both neighbors clamp to the same voxel and the blend is exact.
        let wy = (sy - y_floor) as f32;
        let wx = (sx - x_floor) as f32;

        let y0 = (y_floor as i64).clamp(0, max_y);
        let y1 = (y_floor as i64 + 1).clamp(0, max_y);
        let x0 = (x_floor as i64).clamp(0, max_x);
        let x1 = (x_floor as i64 + 1).clamp(0, max_x);

        corners[0].idx.push(y0 * w as i64 + x0);
        corners[0].weight.push((1.0 - wy) * (1.0 - wx));
        corners[1].idx.push(y0 * w as i64 + x1);
        corners[1].weight.push((1.0 - wy) * wx);
        corners[2].idx.push(y1 * w as i64 + x0);
        corners[2].weight.push(wy * (1.0 - wx));
        corners[3].idx.push(y1 * w as i64 + x1);
        corners[3].weight.push(wy * wx);
    }
    corners
}

fn gather_weighted<B: Backend>(
    flat: &Tensor<B, 3>,
    corner: Corner,
    device: &B::Device,
) -> Tensor<B, 3> {
    let n = corner.weight.len();
    let gathered = flat.clone().select(2, index_tensor::<B>(corner.idx, device));
    gathered * weight_tensor::<B>(corner.weight, device).reshape([1, 1, n])
}

fn index_tensor<B: Backend>(indices: Vec<i64>, device: &B::Device) -> Tensor<B, 1, Int> {
    let n = indices.len();
    Tensor::from_data(TensorData::new(indices, Shape::new([n])), device)
}

fn weight_tensor<B: Backend>(weights: Vec<f32>, device: &B::Device) -> Tensor<B, 1> {
    let n = weights.len();
    Tensor::from_data(TensorData::new(weights, Shape::new([n])), device)
}
