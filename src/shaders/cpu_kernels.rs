// SPDX-License-Identifier: GPL-3.0-only

//! CPU implementations of the filter kernels
//!
//! Each function mirrors the WGSL kernel of the same name texel for texel:
//! inputs are read as normalized floats and outputs are rounded back to 8 bits
//! the way an `rgba8unorm` storage write does. Used when the configuration
//! selects the CPU backend and for deterministic tests.

use tracing::trace;

use super::common::{KernelParams, StageParams};
use super::kernels::Kernel;
use super::pipeline::KernelBackend;
use crate::backends::camera::types::CameraFrame;
use crate::constants::render::BYTES_PER_PIXEL;
use crate::depth::visualization::turbo;
use crate::errors::RenderError;

const PALETTE_STEPS: f32 = 7.0;
const SCROLL_SPEED: f32 = 6.0;
const BAND_HEIGHT: u32 = 8;
const PATTERNS_PER_SECOND: f32 = 12.0;
const ACTIVE_PERCENT: u32 = 12;
const MAX_SHIFT: i32 = 20;
const CHROMA_SPLIT: i32 = 2;
const EYE_OFFSET: i32 = 6;
const SATURATION: f32 = 1.8;
const POSTER_STEPS: f32 = 3.0;
const TINT_SCALE: [f32; 3] = [0.7, 1.0, 0.85];
const TINT_LIFT: [f32; 3] = [0.0, 0.08, 0.0];

type Texel = [f32; 4];

/// Read-only view of an RGBA8 image with edge-clamped fetches
struct Source<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl Source<'_> {
    fn load(&self, x: u32, y: u32) -> Texel {
        let idx = ((y * self.width + x) * BYTES_PER_PIXEL) as usize;
        let px = &self.data[idx..idx + 4];
        [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ]
    }

    fn load_clamped(&self, x: i32, y: i32) -> Texel {
        let cx = x.clamp(0, self.width as i32 - 1) as u32;
        let cy = y.clamp(0, self.height as i32 - 1) as u32;
        self.load(cx, cy)
    }
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn luminance(r: f32, g: f32, b: f32) -> f32 {
    r * 0.2126 + g * 0.7152 + b * 0.0722
}

/// Same permutation as `pcg_hash` in common.wgsl
pub fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

fn pixellate(src: &Source, p: &KernelParams, x: u32, y: u32) -> Texel {
    let block = (p.pixel_size as u32).max(1);
    let sx = ((x / block) * block + block / 2).min(p.width - 1);
    let sy = ((y / block) * block + block / 2).min(p.height - 1);
    let c = src.load(sx, sy);
    let q = |v: f32| (v * PALETTE_STEPS + 0.5).floor() / PALETTE_STEPS;
    [q(c[0]), q(c[1]), q(c[2]), c[3]]
}

fn crt_screen(src: &Source, p: &KernelParams, x: u32, y: u32) -> Texel {
    let c = src.load(x, y);
    let phase = y as f32 * p.scanline_frequency * std::f32::consts::PI + p.time * SCROLL_SPEED;
    let wave = 0.5 + 0.5 * phase.sin();
    let shade = 1.0 - p.scanline_intensity * (1.0 - wave);
    [c[0] * shade, c[1] * shade, c[2] * shade, c[3]]
}

fn glitch(src: &Source, p: &KernelParams, x: u32, y: u32) -> Texel {
    let pattern = (p.time * PATTERNS_PER_SECOND) as u32;
    let h = pcg_hash((y / BAND_HEIGHT) ^ pattern.wrapping_mul(2_654_435_761));
    let active = p.time > 0.0 && (h % 100) < ACTIVE_PERCENT;

    let shift = ((h >> 8) % (2 * MAX_SHIFT + 1) as u32) as i32 - MAX_SHIFT;
    let (offset, split) = if active { (shift, CHROMA_SPLIT) } else { (0, 0) };

    let sx = x as i32 + offset;
    let sy = y as i32;
    let base = src.load_clamped(sx, sy);
    let r = src.load_clamped(sx + split, sy)[0];
    let b = src.load_clamped(sx - split, sy)[2];
    [r, base[1], b, base[3]]
}

fn stereo_glasses(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    let left = src.load_clamped(x as i32 - EYE_OFFSET, y as i32);
    let right = src.load_clamped(x as i32 + EYE_OFFSET, y as i32);
    [left[0], right[1], right[2], src.load(x, y)[3]]
}

fn spectral(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    let c = src.load(x, y);
    let [r, g, b] = turbo(luminance(c[0], c[1], c[2]).clamp(0.0, 1.0));
    [r, g, b, c[3]]
}

fn alien(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    let c = src.load(x, y);
    let rotated = [c[1], c[2], c[0]];
    let gray = luminance(rotated[0], rotated[1], rotated[2]);
    let sat = |v: f32| (gray + (v - gray) * SATURATION).clamp(0.0, 1.0);
    [sat(rotated[0]), sat(rotated[1]), sat(rotated[2]), c[3]]
}

fn alien_alt(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    let c = src.load(x, y);
    let swapped = [c[2], c[0], c[1]];
    let mut out = [0.0, 0.0, 0.0, c[3]];
    for i in 0..3 {
        let poster = (swapped[i] * POSTER_STEPS + 0.5).floor() / POSTER_STEPS;
        out[i] = (poster * TINT_SCALE[i] + TINT_LIFT[i]).clamp(0.0, 1.0);
    }
    out
}

fn inversion(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    let c = src.load(x, y);
    [1.0 - c[0], 1.0 - c[1], 1.0 - c[2], c[3]]
}

fn passthrough(src: &Source, _: &KernelParams, x: u32, y: u32) -> Texel {
    src.load(x, y)
}

/// Run one kernel over a packed RGBA8 image
pub fn run_kernel(kernel: Kernel, params: &KernelParams, input: &[u8]) -> Vec<u8> {
    let shade: fn(&Source, &KernelParams, u32, u32) -> Texel = match kernel {
        Kernel::Passthrough => passthrough,
        Kernel::Pixellate => pixellate,
        Kernel::CrtScreen => crt_screen,
        Kernel::Glitch => glitch,
        Kernel::StereoGlasses => stereo_glasses,
        Kernel::Spectral => spectral,
        Kernel::Alien => alien,
        Kernel::AlienAlt => alien_alt,
        Kernel::Inversion => inversion,
    };

    let src = Source {
        data: input,
        width: params.width,
        height: params.height,
    };
    let row_bytes = (params.width * BYTES_PER_PIXEL) as usize;
    let mut output = vec![0u8; input.len()];

    for (y, row) in output.chunks_exact_mut(row_bytes).enumerate() {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let t = shade(&src, params, x as u32, y as u32);
            px.copy_from_slice(&[unorm8(t[0]), unorm8(t[1]), unorm8(t[2]), unorm8(t[3])]);
        }
    }
    output
}

/// Kernel backend running on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuKernelBackend;

impl KernelBackend for CpuKernelBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn execute(
        &self,
        frame: &CameraFrame,
        stages: &[(Kernel, StageParams)],
    ) -> Result<CameraFrame, RenderError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(RenderError::InvalidFrame(format!(
                "empty {}x{} frame",
                frame.width, frame.height
            )));
        }
        let expected = CameraFrame::expected_len(frame.width, frame.height);
        if frame.data.len() != expected {
            return Err(RenderError::InvalidFrame(format!(
                "expected {} bytes, got {}",
                expected,
                frame.data.len()
            )));
        }

        let mut current: Vec<u8> = frame.data.to_vec();
        for (kernel, stage) in stages {
            trace!(kernel = kernel.name(), "CPU kernel pass");
            let params = stage.to_kernel_params(frame.width, frame.height);
            current = run_kernel(*kernel, &params, &current);
        }

        CameraFrame::from_rgba(frame.width, frame.height, current)
            .map(|out| out.with_captured_at(frame.captured_at))
    }
}
