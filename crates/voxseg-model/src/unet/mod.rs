//! 3D U-Net with residual contracting stages.
//!
//! # Architecture
//!
//! ```text
//! Input: [batch, in_channels, D, H, W]
//!          │
//!          ▼
//!    ┌─────────────┐
//!    │   Stage 1   │──► Skip 1: [batch,  64, D/2,  H/2,  W/2 ]
//!    │ res + pool  │
//!    └─────────────┘
//!          ▼
//!    ┌─────────────┐
//!    │   Stage 2   │──► Skip 2: [batch, 128, D/4,  H/4,  W/4 ]
//!    └─────────────┘
//!          ▼
//!    ┌─────────────┐
//!    │   Stage 3   │──► Skip 3: [batch, 256, D/8,  H/8,  W/8 ]
//!    └─────────────┘
//!          ▼
//!    ┌─────────────┐
//!    │   Stage 4   │──► Skip 4: [batch, 512, D/16, H/16, W/16]
//!    └─────────────┘
//!          ▼
//!    Bottleneck (residual): [batch, 1024, D/16, H/16, W/16]
//!          ▼
//!    4 decoder stages: crop → concat skip → transposed conv 2x → refine
//!          ▼
//!    1x1x1 head: [batch, num_classes, D, H, W]
//! ```
//!
//! Each decoder stage trims its two inputs to their shared spatial
//! extent (prefix crop, see [`crop_to_match`]) before concatenating, so
//! the odd-extent truncation the pooling stages introduce can never
//! produce a concatenation mismatch. Inputs whose spatial dims are not
//! divisible by 16 therefore come out smaller than they went in; the
//! network does not pad to reconcile the two sizes.

mod block;
mod decoder;
mod encoder;

pub use block::{max_pool3d, DoubleConv, ResidualBlock};
pub use decoder::{crop_to_match, Decoder, DecoderStage};
pub use encoder::{Encoder, EncoderStage};

use burn::nn::conv::{Conv3d, Conv3dConfig};
use burn::prelude::*;

/// Configuration for [`UNet3d`].
#[derive(Config, Debug)]
pub struct UNet3dConfig {
    /// Number of input image channels.
    pub in_channels: usize,
    /// Number of output classes, background included.
    pub num_classes: usize,
    /// Channel width of the first contracting stage.
    #[config(default = "64")]
    pub base_channels: usize,
    /// Number of contracting/expanding stages.
    #[config(default = "4")]
    pub num_stages: usize,
    /// Channel multiplier between stages.
    #[config(default = "2")]
    pub channel_mult: usize,
}

impl UNet3dConfig {
    /// Output channel width per contracting stage, shallow to deep.
    pub fn encoder_channels(&self) -> Vec<usize> {
        let mut channels = Vec::with_capacity(self.num_stages);
        let mut width = self.base_channels;
        for _ in 0..self.num_stages {
            channels.push(width);
            width *= self.channel_mult;
        }
        channels
    }

    /// Channel width of the bottleneck block.
    pub fn bottleneck_channels(&self) -> usize {
        self.base_channels * self.channel_mult.pow(self.num_stages as u32)
    }

    /// Initialize the network.
    ///
    /// Misconfigured channel or stage counts fail here, before any
    /// forward pass; the channel table keeps the encoder, decoder and
    /// bottleneck widths consistent by construction.
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet3d<B> {
        assert!(self.in_channels > 0, "in_channels must be at least 1");
        assert!(self.num_classes > 0, "num_classes must be at least 1");
        assert!(self.num_stages > 0, "num_stages must be at least 1");
        assert!(self.channel_mult > 1, "channel_mult must be at least 2");

        let stage_channels = self.encoder_channels();
        let bottleneck_channels = self.bottleneck_channels();

        let encoder = Encoder::new(self.in_channels, &stage_channels, device);
        let bottleneck = ResidualBlock::new(
            stage_channels[self.num_stages - 1],
            bottleneck_channels,
            device,
        );
        let decoder = Decoder::new(bottleneck_channels, &stage_channels, device);
        let head = Conv3dConfig::new([self.base_channels, self.num_classes], [1, 1, 1]).init(device);

        UNet3d {
            encoder,
            bottleneck,
            decoder,
            head,
        }
    }
}

/// 3D encoder-decoder segmentation network with residual contracting
/// blocks and prefix-cropped skip connections.
#[derive(Module, Debug)]
pub struct UNet3d<B: Backend> {
    encoder: Encoder<B>,
    bottleneck: ResidualBlock<B>,
    decoder: Decoder<B>,
    head: Conv3d<B>,
}

impl<B: Backend> UNet3d<B> {
    /// Compute per-voxel class scores.
    ///
    /// Input `[N, C, D, H, W]`; spatial dims divisible by 16 (for the
    /// default four stages) reproduce their extent in the output, other
    /// extents come out smaller (see the module docs).
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let features = self.encoder.forward(input);
        let deepest = features[features.len() - 1].clone();
        let bottleneck = self.bottleneck.forward(deepest);
        let decoded = self.decoder.forward(bottleneck, &features);
        self.head.forward(decoded)
    }

    /// Number of contracting/expanding stages.
    pub fn num_stages(&self) -> usize {
        self.encoder.num_stages()
    }
}
