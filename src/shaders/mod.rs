// SPDX-License-Identifier: GPL-3.0-only

//! Compute kernels and the render pipeline
//!
//! All filters operate directly on RGBA8 images. The same kernel chain runs
//! on the GPU through wgpu or on the CPU through the reference
//! implementations in `cpu_kernels`.

pub mod common;
pub mod composition;
pub mod cpu_kernels;
mod gpu_filter;
mod gpu_processor;
pub mod kernels;
mod pipeline;
pub mod resource_pool;

pub use common::{KernelParams, ShaderConfig, StageParams};
pub use cpu_kernels::CpuKernelBackend;
pub use gpu_filter::GpuKernelBackend;
pub use gpu_processor::{
    CachedDimensions, compute_dispatch_size, padded_bytes_per_row, read_buffer_async, unpad_rows,
};
pub use kernels::{Kernel, KernelLibrary};
pub use pipeline::{FrameRenderer, KernelBackend, RenderPipeline, build_renderer};
pub use resource_pool::{ImageBuffer, ResourcePool};
