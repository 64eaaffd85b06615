// SPDX-License-Identifier: GPL-3.0-only

//! Kernel parameters
//!
//! `ShaderConfig` holds the user-tunable look of the 8-bit filter. Each kernel
//! stage derives a `StageParams` from it, which is widened into the
//! `KernelParams` uniform every kernel reads at binding 2.

use serde::{Deserialize, Serialize};

/// Tunable parameters of the multi-pass filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Edge length of a pixellation block in pixels
    pub pixel_size: f32,
    /// Darkening applied at the scanline trough, 0.0 to 1.0
    pub scanline_intensity: f32,
    /// Scanline cycles per pixel row
    pub scanline_frequency: f32,
    /// Whether the glitch pass receives elapsed time or zero
    pub glitch_enabled: bool,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            pixel_size: 8.0,
            scanline_intensity: 0.3,
            scanline_frequency: 0.8,
            glitch_enabled: true,
        }
    }
}

/// Parameters one kernel stage is invoked with
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StageParams {
    /// Seconds since the pipeline started, zero for time-independent stages
    pub time: f32,
    pub pixel_size: f32,
    pub scanline_intensity: f32,
    pub scanline_frequency: f32,
}

impl StageParams {
    /// Parameters for a stage that reads nothing from the config
    pub fn plain() -> Self {
        Self::default()
    }

    /// Widen into the uniform layout for an image of the given size
    pub fn to_kernel_params(&self, width: u32, height: u32) -> KernelParams {
        KernelParams {
            width,
            height,
            time: self.time,
            pixel_size: self.pixel_size,
            scanline_intensity: self.scanline_intensity,
            scanline_frequency: self.scanline_frequency,
            _padding0: 0,
            _padding1: 0,
        }
    }
}

/// Uniform block shared by every kernel (`KernelParams` in common.wgsl)
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub width: u32,
    pub height: u32,
    pub time: f32,
    pub pixel_size: f32,
    pub scanline_intensity: f32,
    pub scanline_frequency: f32,
    pub _padding0: u32,
    pub _padding1: u32,
}
