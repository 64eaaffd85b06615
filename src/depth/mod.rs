// SPDX-License-Identifier: GPL-3.0-only

//! Depth estimation path
//!
//! The model loads once on its own thread. Until it has loaded (and forever if
//! loading failed) every request yields no result. Requests are independent;
//! each runs one inference on a blocking task.

pub mod model;
pub mod orientation;
pub mod visualization;

use image::imageops;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::backends::camera::types::CameraFrame;
use crate::config::DepthConfig;
use crate::errors::DepthError;
use crate::orientation::Orientation;

pub use model::{DepthMap, DepthModel, OnnxDepthModel};
pub use orientation::{ImageOrientation, display_orientation, model_input_orientation};
pub use visualization::{DepthColormap, depth_to_rgba};

/// Loads a model; runs once on the loader thread
pub type ModelLoader = Box<dyn FnOnce() -> Result<Arc<dyn DepthModel>, DepthError> + Send>;

/// Shared handle to the depth path
#[derive(Clone)]
pub struct DepthEstimator {
    model: Arc<OnceLock<Arc<dyn DepthModel>>>,
    failed: Arc<AtomicBool>,
    colormap: DepthColormap,
}

impl DepthEstimator {
    /// Start loading a model in the background
    pub fn new(loader: ModelLoader, colormap: DepthColormap) -> Self {
        let model: Arc<OnceLock<Arc<dyn DepthModel>>> = Arc::new(OnceLock::new());
        let failed = Arc::new(AtomicBool::new(false));

        let slot = Arc::clone(&model);
        let failed_flag = Arc::clone(&failed);
        let spawned = std::thread::Builder::new()
            .name("depth-model-loader".to_string())
            .spawn(move || {
                // ort panics when the runtime library cannot be loaded
                let result = panic::catch_unwind(AssertUnwindSafe(loader)).unwrap_or_else(|_| {
                    Err(DepthError::ModelLoad("model loader panicked".to_string()))
                });
                match result {
                    Ok(loaded) => {
                        let _ = slot.set(loaded);
                        info!("Depth model ready");
                    }
                    Err(e) => {
                        failed_flag.store(true, Ordering::Release);
                        warn!(error = %e, "Depth model unavailable, depth filter disabled");
                    }
                }
            });

        if let Err(e) = spawned {
            failed.store(true, Ordering::Release);
            warn!(error = %e, "Failed to spawn depth model loader");
        }

        Self {
            model,
            failed,
            colormap,
        }
    }

    /// Load the ONNX model described by the config
    pub fn from_config(config: &DepthConfig) -> Self {
        let model_path = config.model_path.clone().or_else(model::default_model_path);
        let (width, height) = (config.input_width, config.input_height);
        let threads = config.intra_threads;

        let loader: ModelLoader = Box::new(move || {
            let path = model_path.ok_or_else(|| {
                DepthError::ModelLoad("no model path and no data directory".to_string())
            })?;
            let model = OnnxDepthModel::load(&path, width, height, threads)?;
            Ok(Arc::new(model) as Arc<dyn DepthModel>)
        });
        Self::new(loader, config.colormap)
    }

    /// Whether the model has finished loading
    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    /// Whether loading failed; the path then stays unavailable
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Estimate depth for one frame, `None` if unavailable or failed
    pub async fn process_frame(
        &self,
        frame: &CameraFrame,
        orientation: Orientation,
    ) -> Option<CameraFrame> {
        let model = Arc::clone(self.model.get()?);
        let frame = frame.clone();
        let colormap = self.colormap;

        match tokio::task::spawn_blocking(move || {
            estimate(model.as_ref(), &frame, orientation, colormap)
        })
        .await
        {
            Ok(Ok(output)) => Some(output),
            Ok(Err(e)) => {
                debug!(error = %e, "Depth frame skipped");
                None
            }
            Err(e) => {
                warn!(error = %e, "Depth inference task failed");
                None
            }
        }
    }

    /// Blocking variant for one-off use outside the scheduler
    pub fn process_frame_blocking(
        &self,
        frame: &CameraFrame,
        orientation: Orientation,
    ) -> Result<CameraFrame, DepthError> {
        let model = self.model.get().ok_or(DepthError::ModelUnavailable)?;
        estimate(model.as_ref(), frame, orientation, self.colormap)
    }
}

/// Orient, infer and visualize one frame
pub fn estimate(
    model: &dyn DepthModel,
    frame: &CameraFrame,
    orientation: Orientation,
    colormap: DepthColormap,
) -> Result<CameraFrame, DepthError> {
    let image = frame
        .to_image()
        .ok_or_else(|| DepthError::Inference("frame data does not match its size".to_string()))?;

    let upright = model_input_orientation(orientation).apply(&image);
    let depth = model.infer(&upright)?;

    let mut visual = depth_to_rgba(&depth, colormap);
    if visual.dimensions() != upright.dimensions() {
        visual = imageops::resize(
            &visual,
            upright.width(),
            upright.height(),
            imageops::FilterType::Triangle,
        );
    }

    let shown = display_orientation(orientation).apply(&visual);
    Ok(CameraFrame::from_image(shown).with_captured_at(frame.captured_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::time::Duration;

    /// Depth proportional to the red channel, at the input's size
    struct RedDepth;

    impl DepthModel for RedDepth {
        fn infer(&self, image: &RgbaImage) -> Result<DepthMap, DepthError> {
            Ok(DepthMap {
                width: image.width(),
                height: image.height(),
                values: image.pixels().map(|p| p[0] as f32).collect(),
            })
        }
    }

    async fn wait_ready(estimator: &DepthEstimator) {
        for _ in 0..200 {
            if estimator.is_ready() || estimator.has_failed() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn frame() -> CameraFrame {
        let mut image = RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, image::Rgba([200, 0, 0, 255]));
        CameraFrame::from_image(image)
    }

    #[tokio::test]
    async fn test_failed_loader_never_yields() {
        let estimator = DepthEstimator::new(
            Box::new(|| Err(DepthError::ModelLoad("corrupt".to_string()))),
            DepthColormap::Grayscale,
        );
        wait_ready(&estimator).await;
        assert!(estimator.has_failed());
        for orientation in Orientation::ALL {
            assert!(estimator.process_frame(&frame(), orientation).await.is_none());
        }
    }

    #[tokio::test]
    async fn test_panicking_loader_counts_as_failed() {
        let estimator = DepthEstimator::new(
            Box::new(|| panic!("onnxruntime library not found")),
            DepthColormap::Grayscale,
        );
        wait_ready(&estimator).await;
        assert!(estimator.has_failed());
        assert!(!estimator.is_ready());
        assert!(
            estimator
                .process_frame(&frame(), Orientation::Portrait)
                .await
                .is_none()
        );
        assert!(matches!(
            estimator.process_frame_blocking(&frame(), Orientation::Portrait),
            Err(DepthError::ModelUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_not_ready_yields_nothing() {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        let estimator = DepthEstimator::new(
            Box::new(move || {
                let _ = rx.recv();
                Ok(Arc::new(RedDepth) as Arc<dyn DepthModel>)
            }),
            DepthColormap::Grayscale,
        );
        assert!(!estimator.is_ready());
        assert!(
            estimator
                .process_frame(&frame(), Orientation::Portrait)
                .await
                .is_none()
        );
        drop(tx);
        wait_ready(&estimator).await;
        assert!(estimator.is_ready());
    }

    #[tokio::test]
    async fn test_portrait_output_orientation() {
        let estimator = DepthEstimator::new(
            Box::new(|| Ok(Arc::new(RedDepth) as Arc<dyn DepthModel>)),
            DepthColormap::Grayscale,
        );
        wait_ready(&estimator).await;

        let out = estimator
            .process_frame(&frame(), Orientation::Portrait)
            .await
            .unwrap();
        // Right on the way in, Left on the way out: back in sensor layout
        assert_eq!((out.width, out.height), (4, 2));
        let image = out.to_image().unwrap();
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(3, 1)[0], 0);
    }

    #[tokio::test]
    async fn test_landscape_right_is_unrotated() {
        let estimator = DepthEstimator::new(
            Box::new(|| Ok(Arc::new(RedDepth) as Arc<dyn DepthModel>)),
            DepthColormap::Grayscale,
        );
        wait_ready(&estimator).await;
        let out = estimator
            .process_frame_blocking(&frame(), Orientation::LandscapeRight)
            .unwrap();
        assert_eq!(out.to_image().unwrap().get_pixel(0, 0)[0], 255);
    }
}
