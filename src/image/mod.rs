//! Image loading and tensor preprocessing.

mod load;
mod preprocess;

pub use load::{fit_to_input, load_image};
pub use preprocess::{chw_to_hwc, hwc_to_chw, normalize, preprocess, Normalization};

use ndarray::Array4;

/// Image tensor in NCHW format (batch, channels, height, width).
/// Values are per-channel normalized with the model's mean/std statistics.
pub type ImageTensor = Array4<f32>;

/// Native input resolution of ResNet50-v2.
pub const RESNET_IMAGE_SIZE: u32 = 224;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
