//! Building blocks shared by the contracting and expanding paths.

use burn::nn::conv::{Conv3d, Conv3dConfig};
use burn::nn::{BatchNorm, BatchNormConfig, PaddingConfig3d, Relu};
use burn::prelude::*;

/// Two 3x3x3 convolutions, each followed by batch norm and ReLU.
#[derive(Module, Debug)]
pub struct DoubleConv<B: Backend> {
    conv1: Conv3d<B>,
    bn1: BatchNorm<B, 3>,
    conv2: Conv3d<B>,
    bn2: BatchNorm<B, 3>,
    relu: Relu,
}

impl<B: Backend> DoubleConv<B> {
    /// Create a refinement block mapping `in_channels` to `out_channels`.
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv1: conv3x3x3(in_channels, out_channels, device),
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3x3(out_channels, out_channels, device),
            bn2: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
        }
    }

    /// Forward pass, spatial extent unchanged.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(input)));
        self.relu.forward(self.bn2.forward(self.conv2.forward(x)))
    }
}

/// Residual block: conv-bn-relu, conv-bn, shortcut added before the
/// final activation.
///
/// The shortcut is a 1x1x1 convolution when the channel count changes
/// and identity otherwise.
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1: Conv3d<B>,
    bn1: BatchNorm<B, 3>,
    conv2: Conv3d<B>,
    bn2: BatchNorm<B, 3>,
    shortcut: Option<Conv3d<B>>,
    relu: Relu,
}

impl<B: Backend> ResidualBlock<B> {
    /// Create a residual block mapping `in_channels` to `out_channels`.
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let shortcut = (in_channels != out_channels)
            .then(|| Conv3dConfig::new([in_channels, out_channels], [1, 1, 1]).init(device));

        Self {
            conv1: conv3x3x3(in_channels, out_channels, device),
            bn1: BatchNormConfig::new(out_channels).init(device),
            conv2: conv3x3x3(out_channels, out_channels, device),
            bn2: BatchNormConfig::new(out_channels).init(device),
            shortcut,
            relu: Relu::new(),
        }
    }

    /// Forward pass, spatial extent unchanged.
    pub fn forward(&self, input: Tensor<B, 5>) -> Tensor<B, 5> {
        let residual = match &self.shortcut {
            Some(projection) => projection.forward(input.clone()),
            None => input.clone(),
        };

        let x = self.relu.forward(self.bn1.forward(self.conv1.forward(input)));
        let x = self.bn2.forward(self.conv2.forward(x));
        self.relu.forward(x + residual)
    }
}

fn conv3x3x3<B: Backend>(in_channels: usize, out_channels: usize, device: &B::Device) -> Conv3d<B> {
    Conv3dConfig::new([in_channels, out_channels], [3, 3, 3])
        .with_padding(PaddingConfig3d::Explicit(1, 1, 1))
        .init(device)
}

/// 2x max pooling for 5-D feature maps (kernel 2, stride 2).
///
/// Burn ships no 3D pooling module; non-overlapping 2x pooling reduces
/// to a reshape that splits each spatial axis into (half, 2) and a max
/// over the factor axes. Odd extents lose their trailing element, the
/// same truncation stride-2 pooling applies.
pub fn max_pool3d<B: Backend>(input: Tensor<B, 5>) -> Tensor<B, 5> {
    let [b, c, d, h, w] = input.dims();
    let (d2, h2, w2) = (d / 2, h / 2, w / 2);

    let even = input
        .narrow(2, 0, d2 * 2)
        .narrow(3, 0, h2 * 2)
        .narrow(4, 0, w2 * 2);
    let split: Tensor<B, 8> = even.reshape([b, c, d2, 2, h2, 2, w2, 2]);
    split
        .max_dim(7)
        .max_dim(5)
        .max_dim(3)
        .reshape([b, c, d2, h2, w2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::{Shape, TensorData};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_double_conv_shape() {
        let device = Default::default();
        let block = DoubleConv::<TestBackend>::new(3, 8, &device);

        let input = Tensor::<TestBackend, 5>::zeros([1, 3, 4, 6, 6], &device);
        assert_eq!(block.forward(input).dims(), [1, 8, 4, 6, 6]);
    }

    #[test]
    fn test_residual_block_shortcut_on_channel_change() {
        let device = Default::default();
        let projected = ResidualBlock::<TestBackend>::new(4, 8, &device);
        assert!(projected.shortcut.is_some());

        let identity = ResidualBlock::<TestBackend>::new(8, 8, &device);
        assert!(identity.shortcut.is_none());
    }

    #[test]
    fn test_residual_block_shape() {
        let device = Default::default();
        let block = ResidualBlock::<TestBackend>::new(2, 6, &device);

        let input = Tensor::<TestBackend, 5>::zeros([2, 2, 4, 4, 4], &device);
        assert_eq!(block.forward(input).dims(), [2, 6, 4, 4, 4]);
    }

    #[test]
    fn test_max_pool3d_values() {
        let device = Default::default();
        // [1, 1, 2, 2, 2]: one pooling window covering all 8 voxels.
        let input = Tensor::<TestBackend, 5>::from_data(
            TensorData::new(
                vec![0.0f32, 5.0, 1.0, 2.0, -3.0, 4.0, 0.5, 3.5],
                Shape::new([1, 1, 2, 2, 2]),
            ),
            &device,
        );

        let pooled = max_pool3d(input);
        assert_eq!(pooled.dims(), [1, 1, 1, 1, 1]);
        let data = pooled.into_data();
        assert_eq!(data.as_slice::<f32>().unwrap(), &[5.0]);
    }

    #[test]
    fn test_max_pool3d_truncates_odd_extents() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 5>::zeros([1, 2, 5, 7, 3], &device);
        assert_eq!(max_pool3d(input).dims(), [1, 2, 2, 3, 1]);
    }
}
