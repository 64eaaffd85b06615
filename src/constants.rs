// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Frame cadence targets
pub mod timing {
    use super::Duration;

    /// Throttle window for kernel-rendered filters (~30 fps)
    pub const GPU_FRAME_INTERVAL: Duration = Duration::from_millis(33);

    /// Throttle window for the depth path (~15 fps, inference is heavier)
    pub const DEPTH_FRAME_INTERVAL: Duration = Duration::from_millis(66);

    /// Log scheduler throughput every N published frames
    pub const FRAME_LOG_INTERVAL: u64 = 30;
}

/// Compute kernel dispatch
pub mod render {
    /// Workgroup edge length, must match `@workgroup_size` in the kernels
    pub const WORKGROUP_SIZE: u32 = 16;

    /// Longest kernel chain in the filter table
    pub const MAX_STAGES: usize = 3;

    /// Bytes per RGBA8 pixel
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Entry point every kernel exposes
    pub const KERNEL_ENTRY_POINT: &str = "main";
}

/// Resource pool sizing
pub mod pool {
    /// Idle buffers kept per resolution before they are released to the driver
    pub const MAX_IDLE_BUFFERS_PER_SIZE: usize = 4;
}

/// Frame scheduler channels
pub mod scheduler {
    /// Frames waiting for the coordinator; overflow is dropped at the source
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// Processed frames buffered for slow subscribers before they lag
    pub const PROCESSED_CHANNEL_CAPACITY: usize = 8;
}

/// Depth estimation model
pub mod depth {
    /// Default model input width (Depth Anything V2 small)
    pub const MODEL_INPUT_WIDTH: u32 = 518;

    /// Default model input height
    pub const MODEL_INPUT_HEIGHT: u32 = 518;

    /// ImageNet channel means used to normalize model input
    pub const NORMALIZE_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

    /// ImageNet channel standard deviations
    pub const NORMALIZE_STD: [f32; 3] = [0.229, 0.224, 0.225];

    /// Default ONNX model filename searched in the models directory
    pub const MODEL_FILENAME: &str = "depth_anything_v2_small.onnx";

    /// Threads used by a single inference
    pub const DEFAULT_INTRA_THREADS: usize = 2;
}

/// Image formats the file frame source reads
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// File-backed frame source pacing
pub mod virtual_camera {
    /// Frames per second when none is requested
    pub const DEFAULT_FPS: u32 = 30;

    /// Upper bound accepted for the replay rate
    pub const MAX_FPS: u32 = 240;
}

/// Application info
pub mod app_info {
    /// Application directory name for config and photos
    pub const APP_DIR: &str = "retrocam";

    /// Default subdirectory in the user's pictures folder
    pub const PHOTO_DIR: &str = "RetroCam";

    /// Config filename
    pub const CONFIG_FILE: &str = "config.json";

    /// Version string from the build script
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
