//! Contracting path: residual stages with 2x max pooling.

use burn::prelude::*;

use super::block::{max_pool3d, ResidualBlock};

/// One contracting stage: residual block followed by 2x max pooling.
#[derive(Module, Debug)]
pub struct EncoderStage<B: Backend> {
    block: ResidualBlock<B>,
}

impl<B: Backend> EncoderStage<B> {
    /// Create a stage mapping `in_channels` to `out_channels`.
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            block: ResidualBlock::new(in_channels, out_channels, device),
        }
    }

    /// Forward pass; the output is pooled, spatial extent halved.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        max_pool3d(self.block.forward(input))
    }
}

/// Contracting path built from a per-stage channel table.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    stages: Vec<EncoderStage<B>>,
}

impl<B: Backend> Encoder<B> {
    /// Build the stages from the channel table; `stage_channels[i]` is
    /// the output width of stage i.
    pub fn new(in_channels: usize, stage_channels: &[usize], device: &B::Device) -> Self {
        let mut stages = Vec::with_capacity(stage_channels.len());
        let mut current = in_channels;
        for &width in stage_channels {
            stages.push(EncoderStage::new(current, width, device));
            current = width;
        }
        Self { stages }
    }

    /// Run all stages, collecting every stage's pooled output for the
    /// decoder's skip connections (deepest last).
    pub fn forward(&self, input: Tensor<B, 5>) -> Vec<Tensor<B, 5>> {
        let mut features = Vec::with_capacity(self.stages.len());
        let mut x = input;
        for stage in &self.stages {
            x = stage.forward(x);
            features.push(x.clone());
        }
        features
    }

    /// Number of contracting stages.
    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_stage_halves_spatial_extent() {
        let device = Default::default();
        let stage = EncoderStage::<TestBackend>::new(1, 8, &device);

        let input = Tensor::<TestBackend, 5>::zeros([1, 1, 8, 8, 4], &device);
        assert_eq!(stage.forward(input).dims(), [1, 8, 4, 4, 2]);
    }

    #[test]
    fn test_encoder_feature_pyramid() {
        let device = Default::default();
        let encoder = Encoder::<TestBackend>::new(1, &[4, 8, 16], &device);
        assert_eq!(encoder.num_stages(), 3);

        let input = Tensor::<TestBackend, 5>::zeros([1, 1, 16, 16, 8], &device);
        let features = encoder.forward(input);

        assert_eq!(features.len(), 3);
        assert_eq!(features[0].dims(), [1, 4, 8, 8, 4]);
        assert_eq!(features[1].dims(), [1, 8, 4, 4, 2]);
        assert_eq!(features[2].dims(), [1, 16, 2, 2, 1]);
    }
}
