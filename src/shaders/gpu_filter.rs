// SPDX-License-Identifier: GPL-3.0-only

//! wgpu kernel backend
//!
//! One compute pipeline per kernel, all sharing a bind group layout of input
//! texture, output storage texture and a `KernelParams` uniform. A frame is
//! uploaded once, every stage writes a fresh pool buffer, and only the final
//! buffer is read back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, trace};

use super::common::StageParams;
use super::gpu_processor::{
    compute_dispatch_size, padded_bytes_per_row, read_buffer_async, unpad_rows,
};
use super::kernels::{Kernel, KernelLibrary};
use super::pipeline::KernelBackend;
use super::resource_pool::{ImageBuffer, ResourcePool};
use crate::backends::camera::types::CameraFrame;
use crate::constants::render::{
    BYTES_PER_PIXEL, KERNEL_ENTRY_POINT, MAX_STAGES, WORKGROUP_SIZE,
};
use crate::errors::RenderError;
use crate::gpu::{self, wgpu};
use crate::shaders::common::KernelParams;

/// Buffers used by one frame, returned to the pool when dropped
struct FrameBuffers<'a> {
    pool: &'a ResourcePool,
    held: Vec<ImageBuffer>,
}

impl<'a> FrameBuffers<'a> {
    fn new(pool: &'a ResourcePool) -> Self {
        Self {
            pool,
            held: Vec::with_capacity(MAX_STAGES + 1),
        }
    }

    /// Acquire a buffer and its view, returning its index
    fn acquire(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<(usize, wgpu::TextureView), RenderError> {
        let buffer = self
            .pool
            .create_buffer(width, height)
            .ok_or(RenderError::BufferAllocation { width, height })?;
        let view = self.pool.texture_view(&buffer);
        let id = buffer.id();
        self.held.push(buffer);
        let view = view.ok_or(RenderError::TextureView(id))?;
        Ok((self.held.len() - 1, view))
    }

    fn get(&self, index: usize) -> &ImageBuffer {
        &self.held[index]
    }
}

impl Drop for FrameBuffers<'_> {
    fn drop(&mut self) {
        for buffer in self.held.drain(..) {
            self.pool.release(buffer);
        }
    }
}

/// Kernel backend executing on the GPU
pub struct GpuKernelBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    pool: ResourcePool,
    pipelines: HashMap<Kernel, wgpu::ComputePipeline>,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffers: Vec<wgpu::Buffer>,
    // Serializes use of the shared uniforms and staging buffer
    submit_lock: Mutex<()>,
}

impl GpuKernelBackend {
    /// Create the device and build a pipeline for every kernel in the library
    pub async fn new(library: &KernelLibrary) -> Result<Self, RenderError> {
        info!("Initializing GPU kernel backend");

        let (device, queue, gpu_info) = gpu::create_compute_device("retrocam_kernels").await?;

        info!(
            adapter_name = %gpu_info.adapter_name,
            adapter_backend = ?gpu_info.backend,
            "GPU device created for kernels"
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kernel_bind_group_layout"),
            entries: &[
                // Input texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Output storage texture
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                // Uniform buffer
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kernel_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = HashMap::with_capacity(Kernel::ALL.len());
        for kernel in Kernel::ALL {
            let source = library.source(kernel)?;

            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel.name()),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.name()),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some(KERNEL_ENTRY_POINT),
                compilation_options: Default::default(),
                cache: None,
            });
            if let Some(e) = device.pop_error_scope().await {
                return Err(RenderError::KernelCompile {
                    name: kernel.name().to_string(),
                    message: e.to_string(),
                });
            }

            debug!(kernel = kernel.name(), "Kernel pipeline created");
            pipelines.insert(kernel, pipeline);
        }

        let uniform_buffers = (0..MAX_STAGES)
            .map(|i| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("kernel_uniform_{}", i)),
                    size: std::mem::size_of::<KernelParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        Ok(Self {
            pool: ResourcePool::new(Arc::clone(&device)),
            device,
            queue,
            pipelines,
            bind_group_layout,
            uniform_buffers,
            submit_lock: Mutex::new(()),
        })
    }

    fn upload(&self, frame: &CameraFrame, target: &ImageBuffer) {
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.width * BYTES_PER_PIXEL),
                rows_per_image: Some(frame.height),
            },
            extent(frame.width, frame.height),
        );
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

impl KernelBackend for GpuKernelBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn execute(
        &self,
        frame: &CameraFrame,
        stages: &[(Kernel, StageParams)],
    ) -> Result<CameraFrame, RenderError> {
        let (width, height) = (frame.width, frame.height);
        if frame.data.len() != CameraFrame::expected_len(width, height) {
            return Err(RenderError::InvalidFrame(format!(
                "{}x{} frame with {} bytes",
                width,
                height,
                frame.data.len()
            )));
        }
        if stages.len() > self.uniform_buffers.len() {
            return Err(RenderError::InvalidFrame(format!(
                "{} stages exceed the limit of {}",
                stages.len(),
                MAX_STAGES
            )));
        }

        let _guard = self
            .submit_lock
            .lock()
            .map_err(|_| RenderError::Readback("submit lock poisoned".to_string()))?;

        let mut buffers = FrameBuffers::new(&self.pool);
        let (mut current, mut current_view) = buffers.acquire(width, height)?;
        self.upload(frame, buffers.get(current));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("kernel_encoder"),
            });

        for ((kernel, stage), uniform) in stages.iter().zip(&self.uniform_buffers) {
            let pipeline = self
                .pipelines
                .get(kernel)
                .ok_or_else(|| RenderError::MissingKernel(kernel.name().to_string()))?;
            let (output, output_view) = buffers.acquire(width, height)?;

            let params = stage.to_kernel_params(width, height);
            self.queue
                .write_buffer(uniform, 0, bytemuck::bytes_of(&params));

            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("kernel_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&current_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&output_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            });

            {
                let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(kernel.name()),
                    timestamp_writes: None,
                });
                compute_pass.set_pipeline(pipeline);
                compute_pass.set_bind_group(0, Some(&bind_group), &[]);
                compute_pass.dispatch_workgroups(
                    compute_dispatch_size(width, WORKGROUP_SIZE),
                    compute_dispatch_size(height, WORKGROUP_SIZE),
                    1,
                );
            }
            trace!(kernel = kernel.name(), width, height, "Kernel pass encoded");

            current = output;
            current_view = output_view;
        }

        let staging = self
            .pool
            .staging_buffer(width, height)
            .ok_or_else(|| RenderError::Readback("no staging buffer".to_string()))?;

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: buffers.get(current).texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row(width)),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let padded = pollster::block_on(read_buffer_async(&self.device, &staging))?;
        let data = unpad_rows(&padded, width, height);

        CameraFrame::from_rgba(width, height, data).map(|out| out.with_captured_at(frame.captured_at))
    }
}
