// SPDX-License-Identifier: GPL-3.0-only

//! Where captured photos end up

use std::path::{Path, PathBuf};
use tracing::info;

use super::encoding::EncodedImage;
use crate::errors::PhotoError;

/// Persists encoded photos
pub trait PhotoSink: Send + Sync {
    /// Store one photo, returning where it went
    fn persist(&self, encoded: &EncodedImage) -> Result<PathBuf, PhotoError>;
}

/// Writes `IMG_<timestamp>.<ext>` files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free filename for the current second
    fn next_path(&self, extension: &str) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let mut path = self.dir.join(format!("IMG_{}.{}", timestamp, extension));
        let mut suffix = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("IMG_{}_{}.{}", timestamp, suffix, extension));
            suffix += 1;
        }
        path
    }
}

impl PhotoSink for DirectorySink {
    fn persist(&self, encoded: &EncodedImage) -> Result<PathBuf, PhotoError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.next_path(encoded.format.extension());
        std::fs::write(&path, &encoded.data)?;
        info!(path = %path.display(), bytes = encoded.data.len(), "Photo saved");
        Ok(path)
    }
}
