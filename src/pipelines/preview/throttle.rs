// SPDX-License-Identifier: GPL-3.0-only

//! Latest-value rate limiting
//!
//! The first item after an idle period passes straight through and opens a
//! window. Items arriving inside the window replace each other; the survivor
//! is released when the window closes, which opens the next window.

use std::time::Duration;
use tokio::time::Instant;

/// Result of offering an item
#[derive(Debug, PartialEq)]
pub enum Offer<T> {
    /// Pass the item on now; `stale` is a held item whose window closed unreleased
    Emit { item: T, stale: Option<T> },
    /// Held until the window closes; `replaced` if an older item was discarded
    Held { replaced: bool },
}

#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    window_start: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
            pending: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the window length; an open window is re-timed from its start
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    fn window_end(&self) -> Option<Instant> {
        self.window_start.map(|start| start + self.interval)
    }

    pub fn offer(&mut self, item: T, now: Instant) -> Offer<T> {
        match self.window_end() {
            Some(end) if now < end => {
                let replaced = self.pending.replace(item).is_some();
                Offer::Held { replaced }
            }
            _ => {
                self.window_start = Some(now);
                Offer::Emit {
                    item,
                    stale: self.pending.take(),
                }
            }
        }
    }

    /// When the held item is due, `None` if nothing is held
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_some() {
            self.window_end()
        } else {
            None
        }
    }

    /// Release the held item if its window has closed
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        let end = self.deadline()?;
        if now < end {
            return None;
        }
        self.window_start = Some(now);
        self.pending.take()
    }

    /// Drop the held item without touching the window
    pub fn discard(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}
