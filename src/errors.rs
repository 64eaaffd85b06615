// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the frame pipeline
//!
//! Construction failures (no GPU, broken kernel, missing model) are reported
//! through these types. Per-frame failures are converted to "no output" at the
//! render and inference boundaries after being logged.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Depth error: {0}")]
    Depth(#[from] DepthError),
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Frame source error: {0}")]
    Source(String),
    #[error("{0}")]
    Other(String),
}

/// Render pipeline errors
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// No usable GPU adapter or device
    #[error("GPU device unavailable: {0}")]
    DeviceUnavailable(String),
    /// A kernel required by the filter table is not in the library
    #[error("Missing compute kernel: {0}")]
    MissingKernel(String),
    /// A kernel failed to parse, validate or build
    #[error("Kernel '{name}' failed to compile: {message}")]
    KernelCompile { name: String, message: String },
    /// Scratch buffer could not be allocated
    #[error("Failed to allocate {width}x{height} image buffer")]
    BufferAllocation { width: u32, height: u32 },
    /// Buffer cannot be bound as a kernel texture
    #[error("Texture view unavailable for buffer {0}")]
    TextureView(u64),
    /// Result could not be read back from the GPU
    #[error("Readback failed: {0}")]
    Readback(String),
    /// Frame data does not match its declared dimensions
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    /// Filter is not rendered by kernels
    #[error("Filter {0} is not handled by the render pipeline")]
    NotRenderable(&'static str),
}

/// Depth estimation errors
#[derive(Debug, Clone, Error)]
pub enum DepthError {
    /// Model file is not configured or does not exist
    #[error("Depth model not found: {0}")]
    ModelNotFound(PathBuf),
    /// Runtime failed to load the model
    #[error("Failed to load depth model: {0}")]
    ModelLoad(String),
    /// Model is still loading or failed to load
    #[error("Depth model is not loaded")]
    ModelUnavailable,
    /// Inference request failed
    #[error("Inference failed: {0}")]
    Inference(String),
    /// Model produced an unexpected tensor
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
}

/// Photo capture errors
#[derive(Debug, Clone, Error)]
pub enum PhotoError {
    /// No processed frame has been published yet
    #[error("No frame available for capture")]
    NoFrameAvailable,
    /// Crop produced an empty image
    #[error("Capture failed: {0}")]
    CaptureFailed(String),
    /// Encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// Save failed
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration directory on this system")]
    NoConfigDir,
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for PhotoError {
    fn from(err: std::io::Error) -> Self {
        PhotoError::SaveFailed(err.to_string())
    }
}

impl From<image::ImageError> for PhotoError {
    fn from(err: image::ImageError) -> Self {
        PhotoError::EncodingFailed(err.to_string())
    }
}
