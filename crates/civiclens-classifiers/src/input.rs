//! Decoded image input handed to predictors
//!
//! Decoding happens once per request. Each predictor then resizes and
//! rescales according to its own [`InputSpec`], so the fusion layer never
//! sees pixel data.

use civiclens_core::{Error, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Decoded RGB image
#[derive(Debug, Clone)]
pub struct ImageInput {
    pixels: RgbImage,
}

/// Tensor layout a predictor expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Channel-major planes, `[3, height, width]`
    Chw,
    /// Row-major interleaved pixels flattened to one vector, `[height * width * 3]`
    FlatHwc,
}

/// Input contract declared by a predictor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub layout: Layout,
}

impl InputSpec {
    /// Square input of `size` pixels per side
    pub fn square(size: u32, layout: Layout) -> Self {
        Self {
            width: size,
            height: size,
            layout,
        }
    }

    /// Number of f32 values produced by [`ImageInput::to_tensor_data`]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageInput {
    /// Decode an encoded image (JPEG, PNG, WebP, BMP, GIF)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::image("empty image payload"));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::image(format!("failed to decode image: {}", e)))?;

        Self::from_rgb(decoded.to_rgb8())
    }

    /// Wrap an already-decoded RGB buffer
    pub fn from_rgb(pixels: RgbImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(Error::image("image has zero width or height"));
        }
        Ok(Self { pixels })
    }

    /// Build an image from raw interleaved RGB bytes
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            Error::image(format!(
                "buffer does not hold a {}x{} RGB image",
                width, height
            ))
        })?;
        Self::from_rgb(pixels)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Resize and rescale to `[0, 1]` in the layout `spec` asks for
    pub fn to_tensor_data(&self, spec: &InputSpec) -> Vec<f32> {
        let resized = if self.pixels.dimensions() == (spec.width, spec.height) {
            self.pixels.clone()
        } else {
            imageops::resize(&self.pixels, spec.width, spec.height, FilterType::Triangle)
        };

        match spec.layout {
            Layout::FlatHwc => resized.as_raw().iter().map(|v| *v as f32 / 255.0).collect(),
            Layout::Chw => {
                let plane = spec.width as usize * spec.height as usize;
                let mut out = vec![0f32; plane * 3];
                for (idx, pixel) in resized.pixels().enumerate() {
                    for channel in 0..3 {
                        out[channel * plane + idx] = pixel.0[channel] as f32 / 255.0;
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> ImageInput {
        // 2x1: red, blue
        ImageInput::from_raw(2, 1, vec![255, 0, 0, 0, 0, 255]).unwrap()
    }

    #[test]
    fn test_flat_layout_interleaves_channels() {
        let data = checker().to_tensor_data(&InputSpec {
            width: 2,
            height: 1,
            layout: Layout::FlatHwc,
        });
        assert_eq!(data, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_chw_layout_splits_planes() {
        let data = checker().to_tensor_data(&InputSpec {
            width: 2,
            height: 1,
            layout: Layout::Chw,
        });
        // R plane, G plane, B plane
        assert_eq!(data, vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_resize_produces_requested_length() {
        let spec = InputSpec::square(8, Layout::Chw);
        assert_eq!(checker().to_tensor_data(&spec).len(), spec.len());
    }

    #[test]
    fn test_decode_rejects_garbage_bytes() {
        assert!(matches!(
            ImageInput::decode(b"definitely not an image"),
            Err(Error::InvalidImage(_))
        ));
        assert!(ImageInput::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_png_roundtrip() {
        let mut encoded = Vec::new();
        let img = RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .unwrap();

        let decoded = ImageInput::decode(&encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        assert!(ImageInput::from_raw(4, 4, vec![0; 5]).is_err());
    }
}
