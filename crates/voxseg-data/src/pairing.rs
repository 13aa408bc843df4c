//! Image/mask directory pairing.
//!
//! Both directories are listed, filtered to NIfTI extensions, sorted
//! lexicographically and paired positionally: index i of the image list
//! with index i of the mask list. No filename matching is performed;
//! naming schemes that sort into diverging orders will mispair samples,
//! which is why diverging name stems are at least warned about.

use std::fs;
use std::path::{Path, PathBuf};

use voxseg_core::error::{Result, SegmentationError};

/// One co-registered image/mask pair, fixed at construction time.
#[derive(Debug, Clone)]
pub struct VolumePair {
    /// Path of the image volume.
    pub image: PathBuf,
    /// Path of the mask volume.
    pub mask: PathBuf,
}

// Ordered longest-suffix-first so stem stripping removes ".nii.gz"
// before it can match the bare ".nii".
const NIFTI_EXTENSIONS: [&str; 2] = [".nii.gz", ".nii"];

/// Pair the volumes of two directories positionally.
///
/// Fails with [`SegmentationError::PairingMismatch`] when the two
/// directories hold different numbers of volumes.
pub fn pair_volumes(image_dir: &Path, mask_dir: &Path) -> Result<Vec<VolumePair>> {
    let images = list_volumes(image_dir)?;
    let masks = list_volumes(mask_dir)?;

    if images.len() != masks.len() {
        return Err(SegmentationError::PairingMismatch {
            images: images.len(),
            masks: masks.len(),
        });
    }

    let pairs: Vec<VolumePair> = images
        .into_iter()
        .zip(masks)
        .map(|(image, mask)| VolumePair { image, mask })
        .collect();

    let diverging = pairs
        .iter()
        .filter(|pair| stem(&pair.image) != stem(&pair.mask))
        .count();
    if diverging > 0 {
        tracing::warn!(
            count = diverging,
            "positionally paired volumes have diverging name stems; verify the sort order of both directories"
        );
    }

    Ok(pairs)
}

fn list_volumes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_nifti(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_nifti(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| NIFTI_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
        .unwrap_or(false)
}

fn stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    for ext in NIFTI_EXTENSIONS {
        if let Some(stripped) = name.strip_suffix(ext) {
            return Some(stripped);
        }
    }
    Some(name)
}
