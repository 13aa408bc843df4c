//! Error types for the segmentation pipeline.
//!
//! This module provides structured error types shared by the data and
//! model crates, so an embedding harness can tell data problems apart
//! from configuration problems.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for segmentation pipeline operations.
#[derive(Error, Debug)]
pub enum SegmentationError {
    /// A file present at construction time is gone at call time.
    #[error("Missing file: {}", .path.display())]
    MissingFile {
        /// Path of the vanished file.
        path: PathBuf,
    },

    /// Sample index outside the paired range.
    #[error("Sample index {index} out of range for dataset of size {size}")]
    IndexOutOfRange {
        /// Requested sample index.
        index: usize,
        /// Number of paired samples.
        size: usize,
    },

    /// A loaded volume is smaller than the crop window on some axis.
    #[error("Volume is smaller than the crop window: need at least {expected:?}, got {actual:?}")]
    UndersizedVolume {
        /// Minimum spatial extent required by the crop window.
        expected: [usize; 3],
        /// Spatial extent of the loaded volume.
        actual: [usize; 3],
    },

    /// Channel count of a loaded volume disagrees with the configuration.
    #[error("Channel mismatch: expected {expected} channel(s), got {actual}")]
    ChannelMismatch {
        /// Configured channel count.
        expected: usize,
        /// Channel count found in the file.
        actual: usize,
    },

    /// Image and mask directories hold different numbers of volumes.
    #[error("Pairing mismatch: {images} image file(s) vs {masks} mask file(s)")]
    PairingMismatch {
        /// Number of image files after extension filtering.
        images: usize,
        /// Number of mask files after extension filtering.
        masks: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the NIfTI codec.
    #[error("NIfTI error: {0}")]
    Nifti(String),
}

/// Result type for segmentation pipeline operations.
pub type Result<T> = std::result::Result<T, SegmentationError>;

impl SegmentationError {
    /// Create a missing-file error.
    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        Self::MissingFile { path: path.into() }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a NIfTI codec error.
    pub fn nifti(msg: impl Into<String>) -> Self {
        Self::Nifti(msg.into())
    }
}
