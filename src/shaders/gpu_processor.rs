// SPDX-License-Identifier: GPL-3.0-only

//! Shared GPU helpers
//!
//! Dimension caching, dispatch sizing, and buffer readback with the row
//! padding wgpu requires for texture copies.

use crate::constants::render::BYTES_PER_PIXEL;
use crate::errors::RenderError;
use crate::gpu::wgpu;

/// Cached resource dimensions, avoids reallocation when dimensions match
#[derive(Default, Clone, Copy, PartialEq, Debug)]
pub struct CachedDimensions {
    pub width: u32,
    pub height: u32,
}

impl CachedDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn needs_update(&self, width: u32, height: u32) -> bool {
        self.width != width || self.height != height
    }

    pub fn update(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn is_initialized(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Map a MAP_READ buffer and copy its contents out
pub async fn read_buffer_async(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
) -> Result<Vec<u8>, RenderError> {
    let slice = buffer.slice(..);
    let (sender, receiver) = futures::channel::oneshot::channel();

    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| RenderError::Readback(format!("device poll failed: {:?}", e)))?;

    receiver
        .await
        .map_err(|_| RenderError::Readback("mapping callback dropped".to_string()))?
        .map_err(|e| RenderError::Readback(format!("failed to map buffer: {:?}", e)))?;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();

    Ok(data)
}

/// Workgroups needed to cover `dimension`
#[inline]
pub fn compute_dispatch_size(dimension: u32, workgroup_size: u32) -> u32 {
    dimension.div_ceil(workgroup_size)
}

/// Row pitch of a texture-to-buffer copy
#[inline]
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

/// Strip copy padding, returning tightly packed rows
pub fn unpad_rows(padded: &[u8], width: u32, height: u32) -> Vec<u8> {
    let row = (width * BYTES_PER_PIXEL) as usize;
    let pitch = padded_bytes_per_row(width) as usize;
    if row == pitch {
        return padded[..row * height as usize].to_vec();
    }
    let mut packed = Vec::with_capacity(row * height as usize);
    for chunk in padded.chunks(pitch).take(height as usize) {
        packed.extend_from_slice(&chunk[..row]);
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_dimensions() {
        let mut dims = CachedDimensions::default();
        assert!(!dims.is_initialized());
        assert!(dims.needs_update(640, 480));

        dims.update(640, 480);
        assert!(dims.is_initialized());
        assert!(!dims.needs_update(640, 480));
        assert!(dims.needs_update(1280, 720));
    }

    #[test]
    fn test_compute_dispatch_size() {
        assert_eq!(compute_dispatch_size(640, 16), 40);
        assert_eq!(compute_dispatch_size(641, 16), 41);
        assert_eq!(compute_dispatch_size(16, 16), 1);
        assert_eq!(compute_dispatch_size(1, 16), 1);
    }

    #[test]
    fn test_padded_rows() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1), 256);
    }

    #[test]
    fn test_unpad_rows() {
        let width = 3;
        let pitch = padded_bytes_per_row(width) as usize;
        let mut padded = vec![0xAAu8; pitch * 2];
        padded[..12].copy_from_slice(&[1; 12]);
        padded[pitch..pitch + 12].copy_from_slice(&[2; 12]);
        let packed = unpad_rows(&padded, width, 2);
        assert_eq!(packed.len(), 24);
        assert!(packed[..12].iter().all(|b| *b == 1));
        assert!(packed[12..].iter().all(|b| *b == 2));
    }
}
