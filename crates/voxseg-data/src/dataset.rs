//! Paired volume dataset: enumeration, loading and preprocessing.
//!
//! Each `get` call runs the full per-sample pipeline: load both volumes,
//! crop to the fixed window, min-max normalize the image, cast (image to
//! f32, mask to integer class indices), clip the mask to non-negative
//! labels and, when enabled, augment. Nothing is cached; repeated reads
//! hit storage again.

use std::path::PathBuf;
use std::sync::Mutex;

use burn::data::dataset::Dataset;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use voxseg_core::error::{Result, SegmentationError};
use voxseg_core::ops::{crop_to_window, minmax_normalize};
use voxseg_io::read_volume;

use crate::augment::Augmentor;
use crate::pairing::{pair_volumes, VolumePair};

/// Construction-time configuration for [`VolumeDataset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Directory holding the image volumes.
    pub image_dir: PathBuf,
    /// Directory holding the mask volumes.
    pub mask_dir: PathBuf,
    /// Spatial crop window `[D, H, W]` applied to every volume.
    pub crop_window: [usize; 3],
    /// Expected image channel count.
    pub in_channels: usize,
    /// Whether to randomly augment each sample.
    pub augment: bool,
    /// Seed for the augmentation stream.
    pub seed: u64,
}

impl DatasetConfig {
    /// Configuration with the standard crop window and augmentation off.
    pub fn new(image_dir: impl Into<PathBuf>, mask_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            mask_dir: mask_dir.into(),
            crop_window: [256, 256, 128],
            in_channels: 1,
            augment: false,
            seed: 0,
        }
    }

    /// Set the spatial crop window.
    pub fn with_crop_window(mut self, crop_window: [usize; 3]) -> Self {
        self.crop_window = crop_window;
        self
    }

    /// Set the expected image channel count.
    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Enable or disable augmentation.
    pub fn with_augment(mut self, augment: bool) -> Self {
        self.augment = augment;
        self
    }

    /// Set the augmentation seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// One preprocessed sample: image and class-index mask, `[C, D, H, W]`.
#[derive(Debug, Clone)]
pub struct VolumeSample<B: Backend> {
    /// Normalized image, `in_channels` leading channels.
    pub image: Tensor<B, 4>,
    /// Single-channel class-index mask, values ≥ 0.
    pub mask: Tensor<B, 4, Int>,
}

/// Enumerates paired image/mask volumes and yields fixed-shape samples.
///
/// The pair list is fixed at construction; `get` holds no mutable state
/// beyond the augmentation generator behind a mutex, so independent
/// invocations may run concurrently.
#[derive(Debug)]
pub struct VolumeDataset<B: Backend> {
    pairs: Vec<VolumePair>,
    config: DatasetConfig,
    augmentor: Augmentor,
    rng: Mutex<StdRng>,
    device: B::Device,
}

impl<B: Backend> VolumeDataset<B> {
    /// List and pair both directories.
    pub fn new(config: DatasetConfig, device: B::Device) -> Result<Self> {
        if config.in_channels == 0 {
            return Err(SegmentationError::invalid_configuration(
                "in_channels must be at least 1",
            ));
        }
        if config.crop_window.iter().any(|&extent| extent == 0) {
            return Err(SegmentationError::invalid_configuration(
                "crop window extents must be non-zero",
            ));
        }

        let pairs = pair_volumes(&config.image_dir, &config.mask_dir)?;
        tracing::info!(
            samples = pairs.len(),
            image_dir = %config.image_dir.display(),
            mask_dir = %config.mask_dir.display(),
            augment = config.augment,
            "volume dataset ready"
        );

        let rng = Mutex::new(StdRng::seed_from_u64(config.seed));
        Ok(Self {
            pairs,
            augmentor: Augmentor::default(),
            rng,
            config,
            device,
        })
    }

    /// Number of paired samples.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Load, preprocess and (optionally) augment the sample at `index`.
    pub fn get(&self, index: usize) -> Result<(Tensor<B, 4>, Tensor<B, 4, Int>)> {
        let pair = self
            .pairs
            .get(index)
            .ok_or(SegmentationError::IndexOutOfRange {
                index,
                size: self.pairs.len(),
            })?;

        let image = read_volume::<B, _>(&pair.image, &self.device)?;
        let mask = read_volume::<B, _>(&pair.mask, &self.device)?;

        let image_channels = image.dims()[0];
        if image_channels != self.config.in_channels {
            return Err(SegmentationError::ChannelMismatch {
                expected: self.config.in_channels,
                actual: image_channels,
            });
        }
        let mask_channels = mask.dims()[0];
        if mask_channels != 1 {
            return Err(SegmentationError::ChannelMismatch {
                expected: 1,
                actual: mask_channels,
            });
        }

        let image = crop_to_window(image, self.config.crop_window)?;
        let mask = crop_to_window(mask, self.config.crop_window)?;

        let image = minmax_normalize(image);
        // Labels arrive as floats from the codec; clip after the cast so
        // negative label codes collapse to background.
        let mask = mask.int().clamp_min(0);

        if self.config.augment {
            let mut rng = match self.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            return Ok(self.augmentor.apply(image, mask, &mut *rng));
        }

        Ok((image, mask))
    }
}

/// Dataloader-facing view for an external training harness. Failures
/// surface as `None`; the harness owns retry and reporting.
impl<B: Backend> Dataset<VolumeSample<B>> for VolumeDataset<B> {
    fn get(&self, index: usize) -> Option<VolumeSample<B>> {
        match VolumeDataset::get(self, index) {
            Ok((image, mask)) => Some(VolumeSample { image, mask }),
            Err(err) => {
                tracing::error!(index, %err, "failed to load sample");
                None
            }
        }
    }

    fn len(&self) -> usize {
        VolumeDataset::len(self)
    }
}
