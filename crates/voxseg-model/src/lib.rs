pub mod unet;

pub use unet::{crop_to_match, UNet3d, UNet3dConfig};
