// SPDX-License-Identifier: GPL-3.0-only

//! Live preview path: scheduling frames through the filters

mod gate;
mod scheduler;
mod throttle;

pub use gate::{InFlightGate, InFlightPermit};
pub use scheduler::{
    FrameScheduler, ProcessedFrame, SchedulerHandle, SchedulerOptions, StatsSnapshot,
};
pub use throttle::{Offer, Throttle};
