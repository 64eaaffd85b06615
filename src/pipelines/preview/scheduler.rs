// SPDX-License-Identifier: GPL-3.0-only

//! Frame scheduler
//!
//! A single coordinator task owns the throttle, the in-flight gate and the
//! latest processed frame. Frames arrive through a bounded channel and are
//! never queued behind in-flight work: while a frame is being processed,
//! every frame that becomes due is dropped.
//!
//! ```text
//! submit_frame ─▶ [frames] ─▶ throttle ─▶ gate ─▶ renderer | depth
//!                                                      │
//!       latest / subscribe ◀── publish ◀── [completions]
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use super::gate::{InFlightGate, InFlightPermit};
use super::throttle::{Offer, Throttle};
use crate::backends::camera::types::CameraFrame;
use crate::constants::{scheduler, timing};
use crate::depth::DepthEstimator;
use crate::filters::FilterVariant;
use crate::orientation::OrientationState;
use crate::shaders::{FrameRenderer, ShaderConfig};

/// A frame that made it through a filter
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub frame: CameraFrame,
    pub filter: FilterVariant,
    pub produced_at: std::time::Instant,
}

/// Scheduler counters
#[derive(Debug, Default)]
struct SchedulerStats {
    received: AtomicU64,
    dropped_busy: AtomicU64,
    dropped_overflow: AtomicU64,
    superseded: AtomicU64,
    dispatched: AtomicU64,
    published: AtomicU64,
    failed: AtomicU64,
}

impl SchedulerStats {
    fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the scheduler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Frames offered through `submit_frame`
    pub received: u64,
    /// Frames that became due while another was in flight
    pub dropped_busy: u64,
    /// Frames rejected because the coordinator fell behind
    pub dropped_overflow: u64,
    /// Frames replaced by a newer one inside a throttle window
    pub superseded: u64,
    pub dispatched: u64,
    pub published: u64,
    /// Dispatched frames that produced no output
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Selection {
    filter: FilterVariant,
    config: ShaderConfig,
}

enum Control {
    Shutdown,
}

struct Completion {
    output: Option<ProcessedFrame>,
    permit: InFlightPermit,
}

/// What the scheduler runs frames through
pub struct SchedulerOptions {
    /// Kernel renderer, `None` if it could not be built
    pub renderer: Option<Arc<dyn FrameRenderer>>,
    /// Depth path, `None` if depth is not available at all
    pub depth: Option<DepthEstimator>,
    pub orientation: OrientationState,
    pub filter: FilterVariant,
    pub config: ShaderConfig,
}

pub struct FrameScheduler;

impl FrameScheduler {
    /// Start the coordinator on the current tokio runtime
    pub fn spawn(options: SchedulerOptions) -> SchedulerHandle {
        let (frames_tx, frames_rx) = mpsc::channel(scheduler::FRAME_CHANNEL_CAPACITY);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (selection_tx, selection_rx) = watch::channel(Selection {
            filter: options.filter,
            config: options.config,
        });
        let (latest_tx, latest_rx) = watch::channel(None);
        let (processed_tx, _) = broadcast::channel(scheduler::PROCESSED_CHANNEL_CAPACITY);
        let (done_tx, done_rx) = watch::channel(false);
        let stats = Arc::new(SchedulerStats::default());

        info!(
            filter = %options.filter,
            renderer = options.renderer.is_some(),
            depth = options.depth.is_some(),
            "Starting frame scheduler"
        );

        let coordinator = Coordinator {
            frames: frames_rx,
            control: control_rx,
            selection: selection_rx,
            completions: completions_rx,
            completions_tx,
            throttle: Throttle::new(options.filter.frame_interval()),
            gate: InFlightGate::new(),
            renderer: options.renderer,
            depth: options.depth,
            orientation: options.orientation,
            latest: latest_tx,
            processed: processed_tx.clone(),
            stats: Arc::clone(&stats),
            started_at: std::time::Instant::now(),
            window_started_at: std::time::Instant::now(),
        };

        tokio::spawn(async move {
            coordinator.run().await;
            let _ = done_tx.send(true);
        });

        SchedulerHandle {
            frames: frames_tx,
            control: control_tx,
            selection: Arc::new(selection_tx),
            latest: latest_rx,
            processed: processed_tx,
            stats,
            done: done_rx,
        }
    }
}

/// Cheap, cloneable handle to a running scheduler
///
/// The scheduler stops once `shutdown` is called or every handle is dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    frames: mpsc::Sender<CameraFrame>,
    control: mpsc::UnboundedSender<Control>,
    selection: Arc<watch::Sender<Selection>>,
    latest: watch::Receiver<Option<ProcessedFrame>>,
    processed: broadcast::Sender<ProcessedFrame>,
    stats: Arc<SchedulerStats>,
    done: watch::Receiver<bool>,
}

impl SchedulerHandle {
    /// Offer a frame without blocking
    ///
    /// Returns `false` if the frame was not accepted, either because the
    /// coordinator is behind or because the scheduler has stopped.
    pub fn submit_frame(&self, frame: CameraFrame) -> bool {
        SchedulerStats::bump(&self.stats.received);
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                SchedulerStats::bump(&self.stats.dropped_overflow);
                trace!("Frame channel full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Switch filters; applies from the next dispatched frame
    pub fn set_filter(&self, filter: FilterVariant) {
        let changed = self.selection.send_if_modified(|selection| {
            if selection.filter == filter {
                false
            } else {
                selection.filter = filter;
                true
            }
        });
        if changed {
            debug!(%filter, "Filter selected");
        }
    }

    pub fn filter(&self) -> FilterVariant {
        self.selection.borrow().filter
    }

    /// Replace the shader settings; applies from the next dispatched frame
    pub fn set_config(&self, config: ShaderConfig) {
        self.selection.send_modify(|selection| selection.config = config);
    }

    pub fn config(&self) -> ShaderConfig {
        self.selection.borrow().config
    }

    /// Stream of processed frames in publish order
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessedFrame> {
        self.processed.subscribe()
    }

    /// Most recently published frame
    pub fn latest(&self) -> Option<ProcessedFrame> {
        self.latest.borrow().clone()
    }

    /// Watch the latest published frame
    pub fn watch_latest(&self) -> watch::Receiver<Option<ProcessedFrame>> {
        self.latest.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop accepting frames, let in-flight work finish and wait for the
    /// coordinator to exit
    pub async fn shutdown(&self) {
        let _ = self.control.send(Control::Shutdown);
        let mut done = self.done.clone();
        let _ = done.wait_for(|done| *done).await;
    }

    pub fn is_running(&self) -> bool {
        !*self.done.borrow()
    }
}

struct Coordinator {
    frames: mpsc::Receiver<CameraFrame>,
    control: mpsc::UnboundedReceiver<Control>,
    selection: watch::Receiver<Selection>,
    completions: mpsc::UnboundedReceiver<Completion>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    throttle: Throttle<CameraFrame>,
    gate: InFlightGate,
    renderer: Option<Arc<dyn FrameRenderer>>,
    depth: Option<DepthEstimator>,
    orientation: OrientationState,
    latest: watch::Sender<Option<ProcessedFrame>>,
    processed: broadcast::Sender<ProcessedFrame>,
    stats: Arc<SchedulerStats>,
    started_at: std::time::Instant,
    window_started_at: std::time::Instant,
}

impl Coordinator {
    async fn run(mut self) {
        loop {
            let deadline = self.throttle.deadline();
            tokio::select! {
                biased;

                Some(done) = self.completions.recv() => self.complete(done),

                control = self.control.recv() => match control {
                    Some(Control::Shutdown) | None => break,
                },

                changed = self.selection.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    self.apply_selection();
                }

                frame = self.frames.recv() => match frame {
                    Some(frame) => self.on_frame(frame),
                    None => break,
                },

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(frame) = self.throttle.take_due(Instant::now()) {
                        self.dispatch(frame);
                    }
                }
            }
        }

        // Publish whatever is still in flight before stopping
        if self.gate.is_busy()
            && let Some(done) = self.completions.recv().await
        {
            self.complete(done);
        }

        let stats = self.stats.snapshot();
        info!(?stats, "Frame scheduler stopped");
    }

    fn apply_selection(&mut self) {
        let filter = self.selection.borrow_and_update().filter;
        let interval = filter.frame_interval();
        if interval != self.throttle.interval() {
            debug!(%filter, interval_ms = interval.as_millis() as u64, "Throttle cadence changed");
            self.throttle.set_interval(interval);
        }
    }

    fn on_frame(&mut self, frame: CameraFrame) {
        let now = Instant::now();

        match self.throttle.offer(frame, now) {
            Offer::Emit { item, stale } => {
                if stale.is_some() {
                    SchedulerStats::bump(&self.stats.superseded);
                }
                self.dispatch(item);
            }
            Offer::Held { replaced } => {
                if replaced {
                    SchedulerStats::bump(&self.stats.superseded);
                }
            }
        }
    }

    fn dispatch(&mut self, frame: CameraFrame) {
        let Some(permit) = self.gate.try_acquire() else {
            SchedulerStats::bump(&self.stats.dropped_busy);
            trace!("Pipeline busy, dropping frame");
            return;
        };
        SchedulerStats::bump(&self.stats.dispatched);

        let Selection { filter, config } = *self.selection.borrow();
        let completions = self.completions_tx.clone();

        if filter.uses_depth_path() {
            let depth = self.depth.clone();
            let orientation = self.orientation.current();
            tokio::spawn(async move {
                let job = tokio::spawn(async move {
                    match depth {
                        Some(depth) => depth.process_frame(&frame, orientation).await,
                        None => None,
                    }
                });
                let output = finish(job.await, filter);
                let _ = completions.send(Completion { output, permit });
            });
        } else {
            let renderer = self.renderer.clone();
            let elapsed = self.started_at.elapsed();
            tokio::spawn(async move {
                let job = tokio::task::spawn_blocking(move || {
                    renderer.and_then(|r| r.render(&frame, filter, &config, elapsed))
                });
                let output = finish(job.await, filter);
                let _ = completions.send(Completion { output, permit });
            });
        }
    }

    fn complete(&mut self, done: Completion) {
        let Completion { output, permit } = done;

        match output {
            Some(processed) => {
                self.latest.send_replace(Some(processed.clone()));
                // No subscribers is fine
                let _ = self.processed.send(processed);

                let published = SchedulerStats::bump(&self.stats.published);
                if published % timing::FRAME_LOG_INTERVAL == 0 {
                    let window = self.window_started_at.elapsed();
                    self.window_started_at = std::time::Instant::now();
                    info!(
                        published,
                        fps = fps(timing::FRAME_LOG_INTERVAL, window),
                        dropped_busy = self.stats.dropped_busy.load(Ordering::Relaxed),
                        "Scheduler throughput"
                    );
                }
            }
            None => {
                SchedulerStats::bump(&self.stats.failed);
            }
        }

        // Anything held now arrived while busy; the next frame processed
        // must be one that arrives after this completion
        if self.throttle.discard().is_some() {
            SchedulerStats::bump(&self.stats.dropped_busy);
        }

        drop(permit);
    }
}

fn finish(
    joined: Result<Option<CameraFrame>, tokio::task::JoinError>,
    filter: FilterVariant,
) -> Option<ProcessedFrame> {
    match joined {
        Ok(frame) => frame.map(|frame| ProcessedFrame {
            frame,
            filter,
            produced_at: std::time::Instant::now(),
        }),
        Err(e) => {
            warn!(error = %e, %filter, "Frame worker failed");
            None
        }
    }
}

fn fps(frames: u64, window: Duration) -> f64 {
    let secs = window.as_secs_f64();
    if secs > 0.0 { frames as f64 / secs } else { 0.0 }
}
