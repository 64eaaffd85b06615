// SPDX-License-Identifier: GPL-3.0-only

//! GPU device creation for compute work

use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::RenderError;

/// wgpu as used by the compute kernels
pub use wgpu_compute as wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, ...)
    pub backend: wgpu::Backend,
    /// Largest texture edge the device accepts
    pub max_texture_dimension: u32,
}

/// Create a wgpu device and queue for compute work
pub async fn create_compute_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), RenderError> {
    info!(label = label, "Creating GPU device for compute");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::DeviceUnavailable(format!("no suitable adapter: {}", e)))?;

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for compute"
    );
    debug!(
        max_texture_dimension = adapter_limits.max_texture_dimension_2d,
        "Adapter limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| RenderError::DeviceUnavailable(format!("device request failed: {}", e)))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        max_texture_dimension: adapter_limits.max_texture_dimension_2d,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}
