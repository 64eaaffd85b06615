// SPDX-License-Identifier: GPL-3.0-only

//! Persistent configuration
//!
//! Stored as JSON under the user config directory. Every section fills
//! missing fields from its defaults, so older files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{app_info, depth};
use crate::depth::DepthColormap;
use crate::errors::ConfigError;
use crate::filters::FilterVariant;
use crate::shaders::ShaderConfig;

/// Device the filter kernels run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackendKind {
    #[default]
    Gpu,
    Cpu,
}

/// Output format for captured photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoOutputFormat {
    #[default]
    Jpeg,
    Png,
}

/// Depth estimation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// ONNX model file, defaults to the data directory
    pub model_path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub colormap: DepthColormap,
    /// Threads used by one inference
    pub intra_threads: usize,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: depth::MODEL_INPUT_WIDTH,
            input_height: depth::MODEL_INPUT_HEIGHT,
            colormap: DepthColormap::default(),
            intra_threads: depth::DEFAULT_INTRA_THREADS,
        }
    }
}

/// Photo capture settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoConfig {
    /// Directory photos are written to, defaults to Pictures/RetroCam
    pub output_dir: Option<PathBuf>,
    pub format: PhotoOutputFormat,
    /// JPEG quality, 1 to 100
    pub jpeg_quality: u8,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            format: PhotoOutputFormat::default(),
            jpeg_quality: 92,
        }
    }
}

impl PhotoConfig {
    /// Resolved output directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(app_info::PHOTO_DIR)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Look of the 8-bit filter
    pub shader: ShaderConfig,
    /// Filter selected at startup
    pub default_filter: FilterVariant,
    pub render_backend: RenderBackendKind,
    /// Directory of `<kernel>.wgsl` overrides
    pub kernel_dir: Option<PathBuf>,
    pub depth: DepthConfig,
    pub photo: PhotoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shader: ShaderConfig::default(),
            default_filter: FilterVariant::default(),
            render_backend: RenderBackendKind::default(),
            kernel_dir: None,
            depth: DepthConfig::default(),
            photo: PhotoConfig::default(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(app_info::APP_DIR).join(app_info::CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, defaults if the file does not exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}
