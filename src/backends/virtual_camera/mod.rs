// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera: still images replayed as a live frame stream
//!
//! ```text
//! image file / directory
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ FileFrameSource  │  ← paced at the requested fps, optional jitter
//! └──────────────────┘
//!        │ CameraFrame (RGBA)
//!        ▼
//!   FrameCallback (usually the frame scheduler)
//! ```

mod file_source;

pub use file_source::{FileFrameSource, FileSourceOptions, collect_image_paths, load_image_as_frame};
