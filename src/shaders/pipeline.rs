// SPDX-License-Identifier: GPL-3.0-only

//! Render pipeline
//!
//! Applies a filter variant's kernel composition to one frame. The call blocks
//! the invoking worker until the result is available; the scheduler runs it on
//! a blocking task so the coordinator never waits on the GPU.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::common::{ShaderConfig, StageParams};
use super::composition::{self, Route};
use super::cpu_kernels::CpuKernelBackend;
use super::gpu_filter::GpuKernelBackend;
use super::kernels::{Kernel, KernelLibrary};
use crate::backends::camera::types::CameraFrame;
use crate::config::{Config, RenderBackendKind};
use crate::errors::RenderError;
use crate::filters::FilterVariant;

/// Executes kernel chains on some device
pub trait KernelBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run `stages` in order over `frame`, returning the last output
    fn execute(
        &self,
        frame: &CameraFrame,
        stages: &[(Kernel, StageParams)],
    ) -> Result<CameraFrame, RenderError>;
}

/// Per-frame rendering seen by the scheduler
///
/// Failures are logged and reported as `None`; a skipped frame is treated like
/// a dropped one.
pub trait FrameRenderer: Send + Sync {
    fn render(
        &self,
        frame: &CameraFrame,
        variant: FilterVariant,
        config: &ShaderConfig,
        elapsed: Duration,
    ) -> Option<CameraFrame>;
}

/// Kernel-composition renderer
pub struct RenderPipeline {
    backend: Box<dyn KernelBackend>,
}

impl RenderPipeline {
    /// Build the kernel library and the selected backend
    ///
    /// Fails as a whole if any kernel is missing or invalid or the device is
    /// unavailable.
    pub async fn new(
        kind: RenderBackendKind,
        kernel_dir: Option<&Path>,
    ) -> Result<Self, RenderError> {
        let library = KernelLibrary::load(kernel_dir)?;
        Self::with_library(kind, &library).await
    }

    pub async fn with_library(
        kind: RenderBackendKind,
        library: &KernelLibrary,
    ) -> Result<Self, RenderError> {
        let backend: Box<dyn KernelBackend> = match kind {
            RenderBackendKind::Gpu => Box::new(GpuKernelBackend::new(library).await?),
            RenderBackendKind::Cpu => Box::new(CpuKernelBackend),
        };
        info!(backend = backend.name(), "Render pipeline ready");
        Ok(Self::from_backend(backend))
    }

    pub fn from_backend(backend: Box<dyn KernelBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Render one frame, surfacing the failure
    pub fn render_frame(
        &self,
        frame: &CameraFrame,
        variant: FilterVariant,
        config: &ShaderConfig,
        elapsed: Duration,
    ) -> Result<CameraFrame, RenderError> {
        match composition::route(variant) {
            Route::Passthrough => Ok(frame.clone()),
            Route::DepthEstimation => Err(RenderError::NotRenderable(variant.display_name())),
            Route::Kernels(_) => {
                let stages = composition::plan(variant, config, elapsed.as_secs_f32())
                    .ok_or(RenderError::NotRenderable(variant.display_name()))?;
                self.backend.execute(frame, &stages)
            }
        }
    }
}

impl FrameRenderer for RenderPipeline {
    fn render(
        &self,
        frame: &CameraFrame,
        variant: FilterVariant,
        config: &ShaderConfig,
        elapsed: Duration,
    ) -> Option<CameraFrame> {
        match self.render_frame(frame, variant, config, elapsed) {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(filter = %variant, error = %e, "Frame render skipped");
                None
            }
        }
    }
}

/// Construct the configured renderer, or `None` when construction fails
///
/// There is no fallback: without a renderer, kernel filters produce no output.
pub async fn build_renderer(config: &Config) -> Option<Arc<dyn FrameRenderer>> {
    match RenderPipeline::new(config.render_backend, config.kernel_dir.as_deref()).await {
        Ok(pipeline) => Some(Arc::new(pipeline)),
        Err(e) => {
            warn!(error = %e, "Render pipeline unavailable, filters disabled");
            None
        }
    }
}
