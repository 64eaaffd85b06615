// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources feeding the pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Frame Scheduler                │
//! └────────────────────▲────────────────────────┘
//!                      │ submit_frame
//! ┌────────────────────┴────────────────────────┐
//! │            FrameSource trait                │
//! │                     ┌──────────────────┐    │
//! │                     │ Virtual camera   │    │
//! │                     │ (image files)    │    │
//! │                     └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: frame type, source trait and loop threads
//! - [`virtual_camera`]: replays image files as a live stream

pub mod camera;
pub mod virtual_camera;
