// SPDX-License-Identifier: GPL-3.0-only

//! Filter to kernel mapping
//!
//! Each filter variant has one row: either a route elsewhere or an ordered
//! list of kernel stages, each with a function that derives the stage's
//! parameters from the current config and elapsed time. Adding a filter is
//! adding a row.

use super::common::{ShaderConfig, StageParams};
use super::kernels::Kernel;
use crate::filters::FilterVariant;

/// Derives a stage's parameters from the config and seconds since start
pub type BindFn = fn(&ShaderConfig, f32) -> StageParams;

/// One kernel invocation in a composition
#[derive(Clone, Copy)]
pub struct Stage {
    pub kernel: Kernel,
    pub bind: BindFn,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("kernel", &self.kernel).finish()
    }
}

/// Where frames of a variant are processed
#[derive(Debug, Clone, Copy)]
pub enum Route {
    /// Input returned unchanged, no GPU work
    Passthrough,
    /// Ordered kernel chain, each stage reading the previous output
    Kernels(&'static [Stage]),
    /// Handled by the depth estimation path
    DepthEstimation,
}

fn bind_plain(_: &ShaderConfig, _: f32) -> StageParams {
    StageParams::plain()
}

fn bind_pixellate(config: &ShaderConfig, _: f32) -> StageParams {
    StageParams {
        pixel_size: config.pixel_size,
        ..StageParams::plain()
    }
}

fn bind_scanlines(config: &ShaderConfig, elapsed: f32) -> StageParams {
    StageParams {
        time: elapsed,
        scanline_intensity: config.scanline_intensity,
        scanline_frequency: config.scanline_frequency,
        ..StageParams::plain()
    }
}

// Disabled glitch still runs, at time zero where it is an identity.
fn bind_glitch(config: &ShaderConfig, elapsed: f32) -> StageParams {
    StageParams {
        time: if config.glitch_enabled { elapsed } else { 0.0 },
        ..StageParams::plain()
    }
}

const fn single(kernel: Kernel) -> [Stage; 1] {
    [Stage {
        kernel,
        bind: bind_plain,
    }]
}

static EIGHT_BIT: [Stage; 3] = [
    Stage {
        kernel: Kernel::Pixellate,
        bind: bind_pixellate,
    },
    Stage {
        kernel: Kernel::CrtScreen,
        bind: bind_scanlines,
    },
    Stage {
        kernel: Kernel::Glitch,
        bind: bind_glitch,
    },
];
static STEREO_GLASSES: [Stage; 1] = single(Kernel::StereoGlasses);
static SPECTRAL: [Stage; 1] = single(Kernel::Spectral);
static ALIEN: [Stage; 1] = single(Kernel::Alien);
static ALIEN_ALT: [Stage; 1] = single(Kernel::AlienAlt);
static INVERSION: [Stage; 1] = single(Kernel::Inversion);

/// Composition row for a variant
pub fn route(variant: FilterVariant) -> Route {
    match variant {
        FilterVariant::Passthrough => Route::Passthrough,
        FilterVariant::EightBit => Route::Kernels(&EIGHT_BIT),
        FilterVariant::StereoGlasses => Route::Kernels(&STEREO_GLASSES),
        FilterVariant::Spectral => Route::Kernels(&SPECTRAL),
        FilterVariant::Alien => Route::Kernels(&ALIEN),
        FilterVariant::AlienAlt => Route::Kernels(&ALIEN_ALT),
        FilterVariant::Inversion => Route::Kernels(&INVERSION),
        FilterVariant::Depth => Route::DepthEstimation,
    }
}

/// Kernels and their bound parameters for one render call
pub fn plan(
    variant: FilterVariant,
    config: &ShaderConfig,
    elapsed_secs: f32,
) -> Option<Vec<(Kernel, StageParams)>> {
    match route(variant) {
        Route::Kernels(stages) => Some(
            stages
                .iter()
                .map(|stage| (stage.kernel, (stage.bind)(config, elapsed_secs)))
                .collect(),
        ),
        Route::Passthrough | Route::DepthEstimation => None,
    }
}
