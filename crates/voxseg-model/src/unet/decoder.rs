//! Expanding path: skip concatenation, transposed-convolution
//! upsampling and double-conv refinement.

use burn::nn::conv::{ConvTranspose3d, ConvTranspose3dConfig};
use burn::prelude::*;

use super::block::DoubleConv;

/// Trim two feature maps to their shared spatial extent.
///
/// The crop keeps a prefix slice anchored at index 0 on each trailing
/// axis, not a centered one. Which voxels survive decides what feeds
/// the skip concatenation, so the anchor is part of the contract.
pub fn crop_to_match<B: Backend>(
    a: Tensor<B, 5>,
    b: Tensor<B, 5>,
) -> (Tensor<B, 5>, Tensor<B, 5>) {
    let dims_a = a.dims();
    let dims_b = b.dims();
    let shared = [
        dims_a[2].min(dims_b[2]),
        dims_a[3].min(dims_b[3]),
        dims_a[4].min(dims_b[4]),
    ];
    (prefix_crop(a, shared), prefix_crop(b, shared))
}

fn prefix_crop<B: Backend>(tensor: Tensor<B, 5>, extent: [usize; 3]) -> Tensor<B, 5> {
    tensor
        .narrow(2, 0, extent[0])
        .narrow(3, 0, extent[1])
        .narrow(4, 0, extent[2])
}

/// One expanding stage.
#[derive(Module, Debug)]
pub struct DecoderStage<B: Backend> {
    upsample: ConvTranspose3d<B>,
    refine: DoubleConv<B>,
}

impl<B: Backend> DecoderStage<B> {
    /// `in_channels` counts the concatenated input (previous output plus
    /// skip); the transposed convolution reduces it to `out_channels`.
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let upsample = ConvTranspose3dConfig::new([in_channels, out_channels], [2, 2, 2])
            .with_stride([2, 2, 2])
            .init(device);
        Self {
            upsample,
            refine: DoubleConv::new(out_channels, out_channels, device),
        }
    }

    /// Crop the pair to the shared extent, concatenate on channels,
    /// upsample 2x and refine.
    pub fn forward(&self, input: Tensor<B, 5>, skip: Tensor<B, 5>) -> Tensor<B, 5> {
        let (input, skip) = crop_to_match(input, skip);
        let x = Tensor::cat(vec![input, skip], 1);
        self.refine.forward(self.upsample.forward(x))
    }
}

/// Expanding path mirroring the encoder's channel table.
#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    stages: Vec<DecoderStage<B>>,
}

impl<B: Backend> Decoder<B> {
    /// `stage_channels` is the encoder table (shallow to deep);
    /// `bottleneck_channels` feeds the deepest stage.
    pub fn new(bottleneck_channels: usize, stage_channels: &[usize], device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(stage_channels.len());
        let mut previous = bottleneck_channels;
        for &skip_width in stage_channels.iter().rev() {
            stages.push(DecoderStage::new(previous + skip_width, skip_width, device));
            previous = skip_width;
        }
        Self { stages }
    }

    /// Walk the stages from deepest to shallowest, consuming the encoder
    /// features in reverse.
    pub fn forward(&self, bottleneck: Tensor<B, 5>, features: &[Tensor<B, 5>]) -> Tensor<B, 5> {
        let mut x = bottleneck;
        for (stage, skip) in self.stages.iter().zip(features.iter().rev()) {
            x = stage.forward(x, skip.clone());
        }
        x
    }

    /// Number of expanding stages.
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn ramp(dims: [usize; 5]) -> Tensor<TestBackend, 5> {
        let device = Default::default();
        let n = dims.iter().product::<usize>();
        Tensor::from_data(
            TensorData::new((0..n).map(|v| v as f32).collect::<Vec<_>>(), Shape::new(dims)),
            &device,
        )
    }

    #[test]
    fn test_crop_to_match_prefix_values() {
        // Hand-computed: a [1, 1, 3, 3, 2] ramp trimmed against a
        // [1, 1, 2, 2, 2] reference keeps the index-0 corner.
        let a = ramp([1, 1, 3, 3, 2]);
        let b = ramp([1, 1, 2, 2, 2]);

        let (cropped_a, cropped_b) = crop_to_match(a, b.clone());
        assert_eq!(cropped_a.dims(), [1, 1, 2, 2, 2]);

        let data = cropped_a.into_data();
        assert_eq!(
            data.as_slice::<f32>().unwrap(),
            &[0.0, 1.0, 2.0, 3.0, 6.0, 7.0, 8.0, 9.0]
        );

        // The smaller tensor passes through untouched.
        cropped_b.into_data().assert_eq(&b.into_data(), true);
    }

    #[test]
    fn test_crop_to_match_reference_shapes() {
        let a = ramp([1, 1, 130, 130, 65]);
        let b = ramp([1, 1, 128, 128, 64]);

        let expected = a.clone().narrow(2, 0, 128).narrow(3, 0, 128).narrow(4, 0, 64);
        let (cropped_a, cropped_b) = crop_to_match(a, b);

        assert_eq!(cropped_a.dims(), [1, 1, 128, 128, 64]);
        assert_eq!(cropped_b.dims(), [1, 1, 128, 128, 64]);
        cropped_a.into_data().assert_eq(&expected.into_data(), true);
    }

    #[test]
    fn test_decoder_stage_doubles_extent() {
        let device = Default::default();
        // Previous output 16 channels, skip 8 channels.
        let stage = DecoderStage::<TestBackend>::new(24, 8, &device);

        let input = Tensor::<TestBackend, 5>::zeros([1, 16, 2, 4, 4], &device);
        let skip = Tensor::<TestBackend, 5>::zeros([1, 8, 2, 4, 4], &device);

        assert_eq!(stage.forward(input, skip).dims(), [1, 8, 4, 8, 8]);
    }

    #[test]
    fn test_decoder_stage_reconciles_uneven_extents() {
        let device = Default::default();
        let stage = DecoderStage::<TestBackend>::new(24, 8, &device);

        // Skip is one voxel larger on two axes; both get trimmed to the
        // shared minimum before concatenation.
        let input = Tensor::<TestBackend, 5>::zeros([1, 16, 2, 4, 4], &device);
        let skip = Tensor::<TestBackend, 5>::zeros([1, 8, 3, 5, 4], &device);

        assert_eq!(stage.forward(input, skip).dims(), [1, 8, 4, 8, 8]);
    }

    #[test]
    fn test_decoder_walks_feature_pyramid() {
        let device = Default::default();
        let decoder = Decoder::<TestBackend>::new(16, &[4, 8], &device);
        assert_eq!(decoder.num_stages(), 2);

        let bottleneck = Tensor::<TestBackend, 5>::zeros([1, 16, 2, 2, 2], &device);
        let features = vec![
            Tensor::<TestBackend, 5>::zeros([1, 4, 4, 4, 4], &device),
            Tensor::<TestBackend, 5>::zeros([1, 8, 2, 2, 2], &device),
        ];

        let output = decoder.forward(bottleneck, &features);
        assert_eq!(output.dims(), [1, 4, 8, 8, 8]);
    }
}
