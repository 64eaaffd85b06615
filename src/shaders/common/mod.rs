// SPDX-License-Identifier: GPL-3.0-only

//! Shared kernel definitions
//!
//! Every kernel is prefixed with `common.wgsl`, which declares the binding
//! layout and the helpers the kernels share.

mod params;

pub use params::{KernelParams, ShaderConfig, StageParams};

/// Binding layout and shared helpers
///
/// Includes:
/// - `input_tex` / `output_tex` / `params` at bindings 0, 1 and 2
/// - `load_clamped(x, y)` - edge-clamped texel fetch
/// - `luminance(rgb)` - Rec. 709 luma
/// - `pcg_hash(v)` - integer hash used for glitch noise
pub const COMMON_FUNCTIONS: &str = include_str!("common.wgsl");
