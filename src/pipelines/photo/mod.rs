// SPDX-License-Identifier: GPL-3.0-only

//! Photo capture
//!
//! ```text
//! latest ProcessedFrame → aspect crop → encode → PhotoSink
//!       ↓
//! Preview continues uninterrupted
//! ```
//!
//! Capture works on a snapshot of the latest published frame, so the
//! scheduler is never paused. Failures are logged and end there.

pub mod capture;
pub mod encoding;
pub mod sink;

pub use capture::{crop_rect, crop_to_aspect, screen_aspect};
pub use encoding::{EncodedImage, EncodingFormat, PhotoEncoder};
pub use sink::{DirectorySink, PhotoSink};

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::PhotoConfig;
use crate::errors::PhotoError;
use crate::pipelines::preview::ProcessedFrame;

/// Crop, encode and persist snapshots of the preview
#[derive(Clone)]
pub struct PhotoCapture {
    encoder: PhotoEncoder,
    sink: Arc<dyn PhotoSink>,
}

impl PhotoCapture {
    pub fn new(encoder: PhotoEncoder, sink: Arc<dyn PhotoSink>) -> Self {
        Self { encoder, sink }
    }

    /// Encoder and directory sink from the photo settings
    pub fn from_config(config: &PhotoConfig) -> Self {
        Self::new(
            PhotoEncoder::from_config(config),
            Arc::new(DirectorySink::new(config.output_dir())),
        )
    }

    /// Capture a frame, logging instead of returning failures
    pub async fn capture(
        &self,
        latest: Option<ProcessedFrame>,
        target_aspect: f64,
    ) -> Option<PathBuf> {
        match self.try_capture(latest, target_aspect).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Photo capture failed");
                None
            }
        }
    }

    pub async fn try_capture(
        &self,
        latest: Option<ProcessedFrame>,
        target_aspect: f64,
    ) -> Result<PathBuf, PhotoError> {
        let processed = latest.ok_or(PhotoError::NoFrameAvailable)?;
        let image = processed.frame.to_image().ok_or_else(|| {
            PhotoError::CaptureFailed("frame data does not match its size".to_string())
        })?;

        info!(
            filter = %processed.filter,
            width = image.width(),
            height = image.height(),
            target_aspect,
            "Capturing photo"
        );

        let cropped = capture::crop_to_aspect(&image, target_aspect)?;
        let encoded = self.encoder.encode(cropped).await?;

        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.persist(&encoded))
            .await
            .map_err(|e| PhotoError::SaveFailed(format!("save task: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::CameraFrame;
    use crate::filters::FilterVariant;
    use image::RgbaImage;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        photos: Mutex<Vec<EncodedImage>>,
    }

    impl PhotoSink for MemorySink {
        fn persist(&self, encoded: &EncodedImage) -> Result<PathBuf, PhotoError> {
            self.photos.lock().unwrap().push(encoded.clone());
            Ok(PathBuf::from("memory"))
        }
    }

    struct BrokenSink;

    impl PhotoSink for BrokenSink {
        fn persist(&self, _encoded: &EncodedImage) -> Result<PathBuf, PhotoError> {
            Err(PhotoError::SaveFailed("disk full".to_string()))
        }
    }

    fn processed(width: u32, height: u32) -> ProcessedFrame {
        ProcessedFrame {
            frame: CameraFrame::from_image(RgbaImage::new(width, height)),
            filter: FilterVariant::EightBit,
            produced_at: std::time::Instant::now(),
        }
    }

    fn png_capture(sink: Arc<dyn PhotoSink>) -> PhotoCapture {
        let mut encoder = PhotoEncoder::new();
        encoder.set_format(EncodingFormat::Png);
        PhotoCapture::new(encoder, sink)
    }

    #[tokio::test]
    async fn test_capture_crops_to_target() {
        let sink = Arc::new(MemorySink::default());
        let capture = png_capture(sink.clone());

        let path = capture.capture(Some(processed(160, 90)), 9.0 / 16.0).await;
        assert_eq!(path, Some(PathBuf::from("memory")));

        let photos = sink.photos.lock().unwrap();
        assert_eq!(photos.len(), 1);
        // round(90 * 9 / 16) = 51, trimmed to 50 for equal margins
        assert_eq!((photos[0].width, photos[0].height), (50, 90));
    }

    #[tokio::test]
    async fn test_nothing_to_capture() {
        let capture = png_capture(Arc::new(MemorySink::default()));
        assert!(matches!(
            capture.try_capture(None, 1.0).await,
            Err(PhotoError::NoFrameAvailable)
        ));
        assert_eq!(capture.capture(None, 1.0).await, None);
    }

    #[tokio::test]
    async fn test_sink_failure_is_contained() {
        let capture = png_capture(Arc::new(BrokenSink));
        assert_eq!(capture.capture(Some(processed(4, 4)), 1.0).await, None);
    }
}
