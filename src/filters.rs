// SPDX-License-Identifier: GPL-3.0-only

//! Selectable filter variants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::timing;

/// Filter applied to each preview frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterVariant {
    /// Unfiltered camera image
    #[serde(rename = "normal")]
    Passthrough,
    /// Pixellate, CRT scanlines and glitch
    #[default]
    EightBit,
    /// Red/cyan anaglyph
    #[serde(rename = "3d")]
    StereoGlasses,
    /// Thermal-style false color
    Spectral,
    /// Channel-rotated saturated palette
    Alien,
    /// Posterized channel swap
    #[serde(rename = "alien-2")]
    AlienAlt,
    /// Inverted colors
    Inversion,
    /// Monocular depth estimation
    Depth,
}

impl FilterVariant {
    /// All variants in picker order
    pub const ALL: [FilterVariant; 8] = [
        FilterVariant::Passthrough,
        FilterVariant::EightBit,
        FilterVariant::StereoGlasses,
        FilterVariant::Spectral,
        FilterVariant::Alien,
        FilterVariant::AlienAlt,
        FilterVariant::Inversion,
        FilterVariant::Depth,
    ];

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterVariant::Passthrough => "Normal",
            FilterVariant::EightBit => "8-bit",
            FilterVariant::StereoGlasses => "3D",
            FilterVariant::Spectral => "Spectral",
            FilterVariant::Alien => "Alien",
            FilterVariant::AlienAlt => "Alien 2",
            FilterVariant::Inversion => "Inversion",
            FilterVariant::Depth => "Depth",
        }
    }

    /// Stable identifier used in config files and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            FilterVariant::Passthrough => "normal",
            FilterVariant::EightBit => "eight-bit",
            FilterVariant::StereoGlasses => "3d",
            FilterVariant::Spectral => "spectral",
            FilterVariant::Alien => "alien",
            FilterVariant::AlienAlt => "alien-2",
            FilterVariant::Inversion => "inversion",
            FilterVariant::Depth => "depth",
        }
    }

    /// Whether frames go to the depth path instead of the kernels
    pub fn uses_depth_path(&self) -> bool {
        matches!(self, FilterVariant::Depth)
    }

    /// Scheduler throttle window for this variant
    pub fn frame_interval(&self) -> Duration {
        if self.uses_depth_path() {
            timing::DEPTH_FRAME_INTERVAL
        } else {
            timing::GPU_FRAME_INTERVAL
        }
    }
}

impl fmt::Display for FilterVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FilterVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        FilterVariant::ALL
            .into_iter()
            .find(|v| v.id() == needle || v.display_name().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| {
                let known: Vec<&str> = FilterVariant::ALL.iter().map(|v| v.id()).collect();
                format!("unknown filter '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_is_throttled_harder() {
        assert_eq!(
            FilterVariant::Depth.frame_interval(),
            timing::DEPTH_FRAME_INTERVAL
        );
        for variant in FilterVariant::ALL.iter().filter(|v| !v.uses_depth_path()) {
            assert_eq!(variant.frame_interval(), timing::GPU_FRAME_INTERVAL);
        }
    }

    #[test]
    fn test_parse_ids_and_names() {
        for variant in FilterVariant::ALL {
            assert_eq!(variant.id().parse::<FilterVariant>(), Ok(variant));
            assert_eq!(variant.display_name().parse::<FilterVariant>(), Ok(variant));
        }
        assert!("sepia".parse::<FilterVariant>().is_err());
    }

    #[test]
    fn test_serde_uses_ids() {
        for variant in FilterVariant::ALL {
            let json = serde_json::to_string(&variant).unwrap();
            assert_eq!(json, format!("\"{}\"", variant.id()));
            let back: FilterVariant = serde_json::from_str(&json).unwrap();
            assert_eq!(back, variant);
        }
    }
}
