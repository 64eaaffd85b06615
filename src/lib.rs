// SPDX-License-Identifier: GPL-3.0-only

//! RetroCam - real-time retro camera filters
//!
//! This library provides the frame pipeline behind RetroCam: a
//! backpressure-aware frame scheduler, multi-pass compute kernels for the
//! retro filters, a monocular depth estimation path and photo capture.
//!
//! # Architecture
//!
//! - [`backends`]: frame sources (camera frame type, file-backed virtual camera)
//! - [`pipelines`]: the preview scheduler and photo capture
//! - [`shaders`]: compute kernels, kernel backends and the render pipeline
//! - [`depth`]: ONNX depth model, orientation tables and visualization
//! - [`gpu`]: wgpu device creation
//! - [`config`]: user configuration handling
//!
//! # Example
//!
//! ```ignore
//! let renderer = retrocam::shaders::build_renderer(&config).await;
//! let handle = FrameScheduler::spawn(SchedulerOptions { renderer, .. });
//! handle.submit_frame(frame);
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod depth;
pub mod errors;
pub mod filters;
pub mod gpu;
pub mod orientation;
pub mod pipelines;
pub mod shaders;

// Re-export commonly used types
pub use backends::camera::types::CameraFrame;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use filters::FilterVariant;
pub use orientation::{Orientation, OrientationState};
pub use pipelines::preview::{FrameScheduler, ProcessedFrame, SchedulerHandle, SchedulerOptions};
pub use shaders::ShaderConfig;
