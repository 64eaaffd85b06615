// SPDX-License-Identifier: GPL-3.0-only

//! Shared frame types

use image::RgbaImage;
use std::sync::Arc;
use std::time::Instant;

use crate::constants::render::BYTES_PER_PIXEL;
use crate::errors::RenderError;

/// A single RGBA8 frame
///
/// Rows are tightly packed (`width * 4` bytes). Pixel data is reference
/// counted so frames can be handed between the source, the scheduler and
/// subscribers without copying.
#[derive(Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap packed RGBA data, checking its length against the dimensions
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RenderError> {
        let expected = Self::expected_len(width, height);
        if width == 0 || height == 0 || data.len() != expected {
            return Err(RenderError::InvalidFrame(format!(
                "{}x{} frame needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: Arc::from(data),
            captured_at: Instant::now(),
        })
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: Arc::from(image.into_raw()),
            captured_at: Instant::now(),
        }
    }

    /// Copy into an `image` buffer for CPU-side processing
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.to_vec())
    }

    /// Keep the capture timestamp of the frame this one was derived from
    pub fn with_captured_at(mut self, captured_at: Instant) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * BYTES_PER_PIXEL as usize
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_data() {
        assert!(CameraFrame::from_rgba(4, 4, vec![0; 63]).is_err());
        assert!(CameraFrame::from_rgba(0, 4, vec![]).is_err());
        assert!(CameraFrame::from_rgba(4, 4, vec![0; 64]).is_ok());
    }

    #[test]
    fn test_image_round_trip_keeps_pixels() {
        let mut image = RgbaImage::new(3, 2);
        image.put_pixel(2, 1, image::Rgba([1, 2, 3, 4]));
        let frame = CameraFrame::from_image(image.clone());
        assert_eq!(frame.width, 3);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.to_image().unwrap(), image);
    }
}
