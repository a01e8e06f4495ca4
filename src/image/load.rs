//! Image loading utilities.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::error::{Error, Result};

/// Load an image from disk as interleaved 8-bit RGB.
///
/// Any format the `image` crate can decode is accepted; alpha and
/// grayscale inputs are converted to three channels.
///
/// # Errors
///
/// Returns [`Error::ImageLoad`] if the file is missing or cannot be decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "Decoded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );

    Ok(img.into_rgb8())
}

/// Bring a decoded image to the model's fixed input size.
///
/// With `resize` unset, any mismatch is fatal. With `resize` set, the image
/// is rescaled using Lanczos3.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when the size differs and `resize`
/// is `false`.
pub fn fit_to_input(img: RgbImage, width: u32, height: u32, resize: bool) -> Result<RgbImage> {
    if img.dimensions() == (width, height) {
        return Ok(img);
    }

    if !resize {
        return Err(Error::DimensionMismatch {
            expected_width: width,
            expected_height: height,
            width: img.width(),
            height: img.height(),
        });
    }

    tracing::debug!(
        "Resizing {}x{} -> {width}x{height}",
        img.width(),
        img.height()
    );
    let resized = DynamicImage::ImageRgb8(img).resize_exact(width, height, FilterType::Lanczos3);
    Ok(resized.into_rgb8())
}
