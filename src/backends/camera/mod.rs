// SPDX-License-Identifier: GPL-3.0-only

//! Camera-side abstraction
//!
//! Capture hardware lives outside this crate. Anything that can push RGBA
//! frames implements [`FrameSource`]; the scheduler only ever sees the frames.

pub mod frame_loop;
pub mod types;

pub use frame_loop::{LoopAction, SourceLoop};
pub use types::CameraFrame;

use crate::errors::AppError;
use crate::pipelines::preview::SchedulerHandle;

/// Receives every frame a source produces
pub type FrameCallback = Box<dyn FnMut(CameraFrame) + Send>;

/// Push-style producer of camera frames
pub trait FrameSource: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Start delivering frames; fails if already running
    fn start(&mut self, on_frame: FrameCallback) -> Result<(), AppError>;

    /// Stop delivering frames and wait for the producer to finish
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Callback that offers every frame to a scheduler
pub fn scheduler_callback(handle: SchedulerHandle) -> FrameCallback {
    Box::new(move |frame| {
        handle.submit_frame(frame);
    })
}
