// SPDX-License-Identifier: GPL-3.0-only

//! GPU image buffer pool
//!
//! Hands out RGBA8 textures usable as kernel input and output, caches one
//! texture view per buffer, and keeps a bounded number of released buffers per
//! size for reuse by the next frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace, warn};

use super::gpu_processor::{CachedDimensions, padded_bytes_per_row};
use crate::constants::pool::MAX_IDLE_BUFFERS_PER_SIZE;
use crate::gpu::wgpu;

/// Usages every kernel-bound buffer needs
const KERNEL_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::TEXTURE_BINDING
    .union(wgpu::TextureUsages::STORAGE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC)
    .union(wgpu::TextureUsages::COPY_DST);

/// A pooled GPU image
#[derive(Debug)]
pub struct ImageBuffer {
    id: u64,
    pub width: u32,
    pub height: u32,
    texture: wgpu::Texture,
}

impl ImageBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Bounded per-size free list
#[derive(Debug)]
pub struct Recycler<T> {
    idle: HashMap<(u32, u32), Vec<T>>,
    max_per_size: usize,
}

impl<T> Recycler<T> {
    pub fn new(max_per_size: usize) -> Self {
        Self {
            idle: HashMap::new(),
            max_per_size,
        }
    }

    pub fn take(&mut self, width: u32, height: u32) -> Option<T> {
        self.idle.get_mut(&(width, height)).and_then(Vec::pop)
    }

    /// Keep an item for reuse, handing it back if the size is full
    pub fn put(&mut self, width: u32, height: u32, item: T) -> Option<T> {
        let list = self.idle.entry((width, height)).or_default();
        if list.len() >= self.max_per_size {
            return Some(item);
        }
        list.push(item);
        None
    }

    pub fn idle_count(&self) -> usize {
        self.idle.values().map(Vec::len).sum()
    }

    /// Drop idle items of every other size, returning them
    pub fn retain_size(&mut self, width: u32, height: u32) -> Vec<T> {
        let mut evicted = Vec::new();
        self.idle.retain(|size, list| {
            if *size == (width, height) {
                true
            } else {
                evicted.append(list);
                false
            }
        });
        evicted
    }
}

/// Allocates and recycles kernel image buffers
pub struct ResourcePool {
    device: Arc<wgpu::Device>,
    max_dimension: u32,
    next_id: AtomicU64,
    free: Mutex<Recycler<ImageBuffer>>,
    views: Mutex<HashMap<u64, wgpu::TextureView>>,
    staging: Mutex<Option<(CachedDimensions, wgpu::Buffer)>>,
}

impl ResourcePool {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        let max_dimension = device.limits().max_texture_dimension_2d;
        Self {
            device,
            max_dimension,
            next_id: AtomicU64::new(1),
            free: Mutex::new(Recycler::new(MAX_IDLE_BUFFERS_PER_SIZE)),
            views: Mutex::new(HashMap::new()),
            staging: Mutex::new(None),
        }
    }

    /// Get a buffer of the given size, `None` if it cannot be allocated
    pub fn create_buffer(&self, width: u32, height: u32) -> Option<ImageBuffer> {
        if width == 0 || height == 0 || width > self.max_dimension || height > self.max_dimension
        {
            warn!(
                width,
                height,
                max = self.max_dimension,
                "Refusing image buffer allocation"
            );
            return None;
        }

        if let Ok(mut free) = self.free.lock() {
            if let Some(buffer) = free.take(width, height) {
                trace!(id = buffer.id, width, height, "Reusing pooled buffer");
                return Some(buffer);
            }
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pool_image_buffer"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: KERNEL_USAGE,
            view_formats: &[],
        });
        if let Some(e) = pollster::block_on(self.device.pop_error_scope()) {
            warn!(width, height, error = %e, "Image buffer allocation failed");
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, width, height, "Allocated image buffer");
        Some(ImageBuffer {
            id,
            width,
            height,
            texture,
        })
    }

    /// View for binding a buffer to a kernel, cached per buffer
    pub fn texture_view(&self, buffer: &ImageBuffer) -> Option<wgpu::TextureView> {
        if !buffer.texture.usage().contains(KERNEL_USAGE) {
            warn!(id = buffer.id, "Buffer cannot be bound to a kernel");
            return None;
        }

        let mut views = self.views.lock().ok()?;
        let view = views.entry(buffer.id).or_insert_with(|| {
            buffer
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default())
        });
        Some(view.clone())
    }

    /// Return a buffer for reuse
    ///
    /// Only buffers of the most recent size are kept, so a resolution change
    /// frees the previous set. Views of dropped buffers are evicted.
    pub fn release(&self, buffer: ImageBuffer) {
        let Ok(mut free) = self.free.lock() else {
            return;
        };
        let mut dropped = free.retain_size(buffer.width, buffer.height);
        if let Some(rejected) = free.put(buffer.width, buffer.height, buffer) {
            dropped.push(rejected);
        }
        drop(free);

        if dropped.is_empty() {
            return;
        }
        if let Ok(mut views) = self.views.lock() {
            for buffer in &dropped {
                views.remove(&buffer.id);
            }
        }
        trace!(count = dropped.len(), "Released image buffers");
    }

    /// Readback buffer for an image of the given size
    pub fn staging_buffer(&self, width: u32, height: u32) -> Option<wgpu::Buffer> {
        let mut staging = self.staging.lock().ok()?;
        if let Some((dims, buffer)) = staging.as_ref() {
            if !dims.needs_update(width, height) {
                return Some(buffer.clone());
            }
        }

        let size = padded_bytes_per_row(width) as u64 * height as u64;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pool_staging_buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        *staging = Some((CachedDimensions::new(width, height), buffer.clone()));
        Some(buffer)
    }

    pub fn idle_buffers(&self) -> usize {
        self.free.lock().map(|f| f.idle_count()).unwrap_or(0)
    }

    pub fn cached_views(&self) -> usize {
        self.views.lock().map(|v| v.len()).unwrap_or(0)
    }
}
