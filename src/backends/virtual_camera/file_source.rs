// SPDX-License-Identifier: GPL-3.0-only

//! File-backed frame source

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::backends::camera::frame_loop::{LoopAction, SourceLoop};
use crate::backends::camera::types::CameraFrame;
use crate::backends::camera::{FrameCallback, FrameSource};
use crate::constants::{file_formats, virtual_camera};
use crate::errors::AppError;
use crate::shaders::cpu_kernels::pcg_hash;

/// Load an image file as an RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, AppError> {
    info!(path = %path.display(), "Loading image file");

    let image = image::open(path).map_err(|e| {
        AppError::Source(format!("Failed to load image '{}': {}", path.display(), e))
    })?;
    let frame = CameraFrame::from_image(image.to_rgba8());

    debug!(width = frame.width, height = frame.height, "Image loaded");
    Ok(frame)
}

/// A single image, or every supported image in a directory sorted by name
pub fn collect_image_paths(path: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path)
        .map_err(|e| AppError::Source(format!("Failed to read '{}': {}", path.display(), e)))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(file_formats::is_image_extension)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(AppError::Source(format!(
            "No images found in '{}'",
            path.display()
        )));
    }
    Ok(paths)
}

/// Replay pacing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileSourceOptions {
    pub fps: u32,
    /// Largest random delay added to each frame interval
    pub jitter: Duration,
    /// Start over after the last image
    pub looping: bool,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

impl Default for FileSourceOptions {
    fn default() -> Self {
        Self {
            fps: virtual_camera::DEFAULT_FPS,
            jitter: Duration::ZERO,
            looping: true,
            max_frames: None,
        }
    }
}

impl FileSourceOptions {
    pub fn frame_interval(&self) -> Duration {
        let fps = self.fps.clamp(1, virtual_camera::MAX_FPS);
        Duration::from_secs(1) / fps
    }

    /// Delay added before frame `index`, in `[0, jitter]`
    pub fn jitter_for(&self, index: u64) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let fraction = pcg_hash(index as u32) as f64 / u32::MAX as f64;
        self.jitter.mul_f64(fraction)
    }
}

/// Streams decoded images at a steady rate
pub struct FileFrameSource {
    name: String,
    frames: Arc<Vec<CameraFrame>>,
    options: FileSourceOptions,
    controller: Option<SourceLoop>,
}

impl FileFrameSource {
    /// Decode every image up front so replay cost is only the copy
    pub fn open(path: &Path, options: FileSourceOptions) -> Result<Self, AppError> {
        let frames = collect_image_paths(path)?
            .iter()
            .map(|p| load_image_as_frame(p))
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            path = %path.display(),
            frames = frames.len(),
            fps = options.fps,
            "File frame source ready"
        );
        Ok(Self::from_frames(
            format!("file:{}", path.display()),
            frames,
            options,
        ))
    }

    pub fn from_frames(name: String, frames: Vec<CameraFrame>, options: FileSourceOptions) -> Self {
        Self {
            name,
            frames: Arc::new(frames),
            options,
            controller: None,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Block until the source runs out of frames
    pub fn wait(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.join();
        }
    }
}

impl FrameSource for FileFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self, mut on_frame: FrameCallback) -> Result<(), AppError> {
        if self.is_running() {
            return Err(AppError::Source(format!("{} is already running", self.name)));
        }
        if self.frames.is_empty() {
            return Err(AppError::Source(format!("{} has no frames", self.name)));
        }

        let frames = Arc::clone(&self.frames);
        let options = self.options;
        let interval = options.frame_interval();
        let mut index: u64 = 0;
        let mut next_due = Instant::now();

        let controller = SourceLoop::start(&self.name, move || {
            if options.max_frames.is_some_and(|max| index >= max) {
                return LoopAction::Stop;
            }
            let slot = (index % frames.len() as u64) as usize;
            if !options.looping && index >= frames.len() as u64 {
                return LoopAction::Stop;
            }

            let now = Instant::now();
            if next_due > now {
                std::thread::sleep(next_due - now);
            }

            on_frame(frames[slot].clone().with_captured_at(Instant::now()));
            index += 1;
            next_due += interval + options.jitter_for(index);
            // Do not burst to catch up after a stall
            next_due = next_due.max(Instant::now());
            LoopAction::Continue
        })
        .map_err(|e| AppError::Source(format!("Failed to start {}: {}", self.name, e)))?;

        self.controller = Some(controller);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
        }
    }

    fn is_running(&self) -> bool {
        self.controller.as_ref().is_some_and(|c| c.is_running())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;
    use std::sync::Mutex;

    fn frames(n: u8) -> Vec<CameraFrame> {
        (0..n)
            .map(|i| CameraFrame::from_image(RgbaImage::from_pixel(2, 2, image::Rgba([i, 0, 0, 255]))))
            .collect()
    }

    fn collecting() -> (Arc<Mutex<Vec<u8>>>, FrameCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: FrameCallback = Box::new(move |frame: CameraFrame| {
            sink.lock().unwrap().push(frame.data[0]);
        });
        (seen, callback)
    }

    #[test]
    fn test_plays_once_in_order() {
        let mut source = FileFrameSource::from_frames(
            "test".to_string(),
            frames(3),
            FileSourceOptions {
                fps: 240,
                looping: false,
                ..FileSourceOptions::default()
            },
        );
        let (seen, callback) = collecting();
        source.start(callback).unwrap();
        source.wait();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_loops_until_max_frames() {
        let mut source = FileFrameSource::from_frames(
            "test".to_string(),
            frames(2),
            FileSourceOptions {
                fps: 240,
                max_frames: Some(5),
                ..FileSourceOptions::default()
            },
        );
        let (seen, callback) = collecting();
        source.start(callback).unwrap();
        source.wait();
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 0, 1, 0]);
        assert!(!source.is_running());
    }

    #[test]
    fn test_empty_source_refuses_to_start() {
        let mut source =
            FileFrameSource::from_frames("empty".to_string(), Vec::new(), FileSourceOptions::default());
        let (_, callback) = collecting();
        assert!(source.start(callback).is_err());
    }

    #[test]
    fn test_jitter_is_bounded() {
        let options = FileSourceOptions {
            jitter: Duration::from_millis(10),
            ..FileSourceOptions::default()
        };
        for index in 0..100 {
            assert!(options.jitter_for(index) <= Duration::from_millis(10));
        }
        assert_eq!(FileSourceOptions::default().jitter_for(7), Duration::ZERO);
        assert_eq!(
            FileSourceOptions::default().frame_interval(),
            Duration::from_secs(1) / 30
        );
    }

    #[test]
    fn test_directory_listing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png"] {
            RgbaImage::new(2, 2).save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let paths = collect_image_paths(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let mut source = FileFrameSource::open(dir.path(), FileSourceOptions::default()).unwrap();
        assert_eq!(source.frame_count(), 2);
        source.stop();
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_image_paths(dir.path()).is_err());
    }
}
