// SPDX-License-Identifier: GPL-3.0-only

//! Depth visualization helpers
//!
//! Converts a relative inverse depth map (larger = nearer) to an RGBA image,
//! normalized to the map's own range so near is always bright/warm.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::model::DepthMap;

/// Color mapping of the depth visualization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepthColormap {
    /// Near = bright, far = dark
    #[default]
    Grayscale,
    /// Near = red, far = blue
    Turbo,
}

/// Turbo colormap: perceptually uniform rainbow, polynomial approximation
///
/// Based on: https://ai.googleblog.com/2019/08/turbo-improved-rainbow-colormap-for.html
#[inline]
pub fn turbo(t: f32) -> [f32; 3] {
    let r = 0.13572138
        + t * (4.6153926 + t * (-42.66032 + t * (132.13108 + t * (-152.54825 + t * 59.28144))));
    let g = 0.09140261
        + t * (2.19418 + t * (4.84296 + t * (-14.18503 + t * (4.27805 + t * 2.53377))));
    let b = 0.1066733
        + t * (12.64194 + t * (-60.58204 + t * (109.99648 + t * (-82.52904 + t * 20.43388))));
    [r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0)]
}

/// Finite value range of a depth map, `None` if no value is finite
fn value_range(values: &[f32]) -> Option<(f32, f32)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Render a depth map as RGBA at the map's resolution
pub fn depth_to_rgba(depth: &DepthMap, colormap: DepthColormap) -> RgbaImage {
    let (lo, hi) = value_range(&depth.values).unwrap_or((0.0, 0.0));
    let span = hi - lo;

    RgbaImage::from_fn(depth.width, depth.height, |x, y| {
        let v = depth.values[(y * depth.width + x) as usize];
        let t = if span > f32::EPSILON && v.is_finite() {
            ((v - lo) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        match colormap {
            DepthColormap::Grayscale => {
                let gray = (t * 255.0).round() as u8;
                Rgba([gray, gray, gray, 255])
            }
            DepthColormap::Turbo => {
                let [r, g, b] = turbo(t);
                Rgba([(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8, 255])
            }
        }
    })
}
