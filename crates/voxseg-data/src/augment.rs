//! Random augmentation for paired image/mask volumes.
//!
//! Five independent steps, each firing with the configured probability,
//! always in the same order: flip depth, flip width, flip height,
//! rotate in the (H, W) plane, zoom on all three spatial axes. Image
//! and mask receive the same geometric transform; the image is
//! resampled linearly, the mask with nearest-neighbor lookup so class
//! identities survive.
//!
//! All randomness comes from the caller-supplied generator, consumed in
//! a fixed order: one decision draw per step, plus one parameter draw
//! immediately after the rotate and zoom decisions when those fire.
//! Re-running with an identically seeded generator reproduces the exact
//! transform sequence.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use rand::Rng;
use serde::{Deserialize, Serialize};

use voxseg_core::resample::{rotate_hw, rotate_hw_labels, zoom, zoom_labels, Interpolation};

/// Configuration for random augmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Probability of each step firing, drawn independently per step.
    pub probability: f64,
    /// Rotation bound in degrees; angles are uniform in `[-max, max]`.
    pub max_rotation_deg: f64,
    /// Inclusive zoom factor range, applied to all three spatial axes.
    pub zoom_range: (f64, f64),
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            probability: 0.5,
            max_rotation_deg: 30.0,
            zoom_range: (0.9, 1.1),
        }
    }
}

/// Applies the augmentation pipeline to one sample.
#[derive(Debug, Clone, Default)]
pub struct Augmentor {
    config: AugmentConfig,
}

impl Augmentor {
    /// Create an augmentor with the given step configuration.
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    /// Transform an image/mask pair with one pass over the step list.
    ///
    /// Later steps see the results of earlier ones; the zoom step
    /// resamples onto the unchanged output grid, so the spatial shape
    /// of both tensors is preserved for every parameter draw.
    pub fn apply<B: Backend, R: Rng>(
        &self,
        image: Tensor<B, 4>,
        mask: Tensor<B, 4, Int>,
        rng: &mut R,
    ) -> (Tensor<B, 4>, Tensor<B, 4, Int>) {
        let mut image = image;
        let mut mask = mask;

        // Axis order within [C, D, H, W]: depth 1, height 2, width 3.
        if rng.gen_bool(self.config.probability) {
            image = image.flip([1]);
            mask = mask.flip([1]);
        }
        if rng.gen_bool(self.config.probability) {
            image = image.flip([3]);
            mask = mask.flip([3]);
        }
        if rng.gen_bool(self.config.probability) {
            image = image.flip([2]);
            mask = mask.flip([2]);
        }
        if rng.gen_bool(self.config.probability) {
            let bound = self.config.max_rotation_deg;
            let angle = rng.gen_range(-bound..=bound);
            image = rotate_hw(image, angle, Interpolation::Linear);
            mask = rotate_hw_labels(mask, angle);
        }
        if rng.gen_bool(self.config.probability) {
            let (lo, hi) = self.config.zoom_range;
            let factor = rng.gen_range(lo..=hi);
            image = zoom(image, factor, Interpolation::Linear);
            mask = zoom_labels(mask, factor);
        }

        (image, mask)
    }
}
