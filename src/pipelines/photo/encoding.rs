// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! - JPEG (with quality control)
//! - PNG (lossless)
//!
//! Encoding runs on a blocking task so the caller's runtime is not stalled.

use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, info};

use crate::config::{PhotoConfig, PhotoOutputFormat};
use crate::errors::PhotoError;

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            EncodingFormat::Jpeg => ImageFormat::Jpeg,
            EncodingFormat::Png => ImageFormat::Png,
        }
    }
}

impl From<PhotoOutputFormat> for EncodingFormat {
    fn from(format: PhotoOutputFormat) -> Self {
        match format {
            PhotoOutputFormat::Jpeg => EncodingFormat::Jpeg,
            PhotoOutputFormat::Png => EncodingFormat::Png,
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl PhotoEncoder {
    /// JPEG at quality 92
    pub fn new() -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            jpeg_quality: 92,
        }
    }

    pub fn from_config(config: &PhotoConfig) -> Self {
        let mut encoder = Self::new();
        encoder.set_format(config.format.into());
        encoder.set_jpeg_quality(config.jpeg_quality);
        encoder
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    pub fn set_format(&mut self, format: EncodingFormat) {
        self.format = format;
    }

    /// Set JPEG quality, clamped to 1..=100
    pub fn set_jpeg_quality(&mut self, quality: u8) {
        self.jpeg_quality = quality.clamp(1, 100);
    }

    /// Encode on a blocking task
    pub async fn encode(&self, image: RgbaImage) -> Result<EncodedImage, PhotoError> {
        info!(
            width = image.width(),
            height = image.height(),
            format = ?self.format,
            "Starting encoding"
        );

        let encoder = *self;
        tokio::task::spawn_blocking(move || encoder.encode_blocking(image))
            .await
            .map_err(|e| PhotoError::EncodingFailed(format!("encoding task: {}", e)))?
    }

    pub fn encode_blocking(&self, image: RgbaImage) -> Result<EncodedImage, PhotoError> {
        let (width, height) = image.dimensions();
        let data = match self.format {
            EncodingFormat::Jpeg => Self::encode_jpeg(image, self.jpeg_quality)?,
            EncodingFormat::Png => Self::encode_png(&image)?,
        };

        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            format: self.format,
            width,
            height,
        })
    }

    /// JPEG has no alpha channel; the image is flattened to RGB first
    fn encode_jpeg(image: RgbaImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
        let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
        encoder.encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(buffer)
    }

    fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)?;
        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> RgbaImage {
        RgbaImage::from_pixel(8, 6, image::Rgba([200, 40, 10, 255]))
    }

    #[test]
    fn test_format_extensions() {
        assert_eq!(EncodingFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodingFormat::Png.extension(), "png");
    }

    #[test]
    fn test_quality_clamped() {
        let mut encoder = PhotoEncoder::new();
        encoder.set_jpeg_quality(0);
        assert_eq!(encoder.jpeg_quality, 1);
        encoder.set_jpeg_quality(200);
        assert_eq!(encoder.jpeg_quality, 100);
    }

    #[test]
    fn test_png_is_lossless() {
        let mut encoder = PhotoEncoder::new();
        encoder.set_format(EncodingFormat::Png);
        let encoded = encoder.encode_blocking(image()).unwrap();
        let decoded = image::load_from_memory(&encoded.data).unwrap().to_rgba8();
        assert_eq!(decoded, image());
    }

    #[tokio::test]
    async fn test_jpeg_decodes_to_same_size() {
        let encoded = PhotoEncoder::new().encode(image()).await.unwrap();
        assert_eq!((encoded.width, encoded.height), (8, 6));
        let decoded = image::load_from_memory_with_format(&encoded.data, ImageFormat::Jpeg)
            .unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
    }

    #[test]
    fn test_from_config() {
        let config = PhotoConfig {
            format: PhotoOutputFormat::Png,
            ..PhotoConfig::default()
        };
        assert_eq!(PhotoEncoder::from_config(&config).format(), EncodingFormat::Png);
    }
}
