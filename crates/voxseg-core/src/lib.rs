pub mod error;
pub mod ops;
pub mod resample;

pub use error::{Result, SegmentationError};
pub use resample::Interpolation;
