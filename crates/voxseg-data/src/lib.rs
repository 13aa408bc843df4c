pub mod augment;
pub mod dataset;
pub mod pairing;

pub use augment::{AugmentConfig, Augmentor};
pub use dataset::{DatasetConfig, VolumeDataset, VolumeSample};
pub use pairing::VolumePair;
