//! Conversion of interleaved RGB buffers into normalized planar tensors.

use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array3, Array4};

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Per-channel normalization statistics, applied after scaling bytes to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub mean: [f32; RGB_CHANNELS],
    pub std: [f32; RGB_CHANNELS],
}

impl Normalization {
    /// ImageNet training statistics.
    pub const IMAGENET: Self = Self {
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    /// Normalize one raw channel byte.
    #[inline]
    #[must_use]
    pub fn apply(&self, channel: usize, raw: u8) -> f32 {
        let value = f32::from(raw) / 255.0;
        (value - self.mean[channel]) / self.std[channel]
    }
}

impl Default for Normalization {
    fn default() -> Self {
        Self::IMAGENET
    }
}

/// Transpose interleaved HWC pixels into planar CHW bytes of shape `(3, H, W)`.
#[must_use]
pub fn hwc_to_chw(img: &RgbImage) -> Array3<u8> {
    let (width, height) = img.dimensions();
    let mut planar = Array3::<u8>::zeros((RGB_CHANNELS, height as usize, width as usize));

    for (x, y, pixel) in img.enumerate_pixels() {
        for (c, &sample) in pixel.0.iter().enumerate() {
            planar[[c, y as usize, x as usize]] = sample;
        }
    }

    planar
}

/// Transpose planar CHW bytes back into an interleaved RGB image.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the array does not have three channels
/// or its extent does not fit in image coordinates.
pub fn chw_to_hwc(planar: &Array3<u8>) -> Result<RgbImage> {
    let (channels, height, width) = planar.dim();
    if channels != RGB_CHANNELS {
        return Err(Error::ShapeMismatch {
            expected: format!("{RGB_CHANNELS} channels"),
            actual: format!("{channels} channels"),
        });
    }

    let to_u32 = |n: usize| {
        u32::try_from(n).map_err(|_| Error::ShapeMismatch {
            expected: "extent within u32".to_string(),
            actual: n.to_string(),
        })
    };

    Ok(ImageBuffer::from_fn(to_u32(width)?, to_u32(height)?, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([planar[[0, y, x]], planar[[1, y, x]], planar[[2, y, x]]])
    }))
}

/// Scale and normalize planar bytes into a `(1, 3, H, W)` float tensor.
#[must_use]
pub fn normalize(planar: &Array3<u8>, norm: &Normalization) -> ImageTensor {
    let (channels, height, width) = planar.dim();
    Array4::from_shape_fn((1, channels, height, width), |(_, c, y, x)| {
        norm.apply(c, planar[[c, y, x]])
    })
}

/// Turn a decoded RGB image into the model input tensor.
///
/// Takes the image by value; the pixel buffer is dropped as soon as the
/// planar copy exists.
#[must_use]
pub fn preprocess(img: RgbImage, norm: &Normalization) -> ImageTensor {
    let planar = hwc_to_chw(&img);
    drop(img);
    normalize(&planar, norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Axis;

    fn gradient(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 7 + y * 13) % 256) as u8;
            Rgb([v, v.wrapping_add(85), v.wrapping_add(170)])
        })
    }

    #[test]
    fn test_tensor_shape() {
        let tensor = preprocess(RgbImage::new(224, 224), &Normalization::IMAGENET);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert_eq!(tensor.len(), 3 * 224 * 224);
    }

    #[test]
    fn test_planar_index_layout() {
        let (w, h) = (5usize, 4usize);
        let img = gradient(5, 4);
        let norm = Normalization::IMAGENET;
        let tensor = preprocess(img.clone(), &norm);
        let flat = tensor.as_slice().unwrap();

        for y in 0..h {
            for x in 0..w {
                let pixel = img.get_pixel(x as u32, y as u32);
                for c in 0..3 {
                    let expected = norm.apply(c, pixel[c]);
                    assert_eq!(flat[c * h * w + y * w + x], expected);
                }
            }
        }
    }

    #[test]
    fn test_normalization_range() {
        let norm = Normalization::IMAGENET;
        let tensor = preprocess(gradient(224, 224), &norm);

        for c in 0..3 {
            let lo = norm.apply(c, 0);
            let hi = norm.apply(c, 255);
            for &v in tensor.index_axis(Axis(1), c) {
                assert!(v >= lo - 1e-6 && v <= hi + 1e-6, "channel {c}: {v}");
            }
        }
    }

    #[test]
    fn test_known_values() {
        let norm = Normalization::IMAGENET;
        assert!((norm.apply(0, 0) - (-0.485 / 0.229)).abs() < 1e-6);
        assert!((norm.apply(2, 255) - ((1.0 - 0.406) / 0.225)).abs() < 1e-6);
    }

    #[test]
    fn test_transpose_round_trip() {
        let img = gradient(17, 9);
        let planar = hwc_to_chw(&img);
        assert_eq!(planar.dim(), (3, 9, 17));
        assert_eq!(chw_to_hwc(&planar).unwrap(), img);
    }

    #[test]
    fn test_chw_to_hwc_rejects_wrong_channels() {
        let planar = Array3::<u8>::zeros((4, 2, 2));
        assert!(matches!(
            chw_to_hwc(&planar),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
