//! Frame throttling for the game loop.
//!
//! Frames arrive as fast as the driver polls; only frames where the current
//! tick interval has elapsed since the last accepted tick do any work.

use std::time::{Duration, Instant};

/// Identifies the loop that owns the throttle. Restarting hands out a new one,
/// which turns every older token stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

#[derive(Debug)]
pub struct FrameThrottle {
    epoch: u64,
    last_tick: Option<Instant>,
}

impl FrameThrottle {
    pub fn new() -> Self {
        FrameThrottle { epoch: 0, last_tick: None }
    }

    /// Starts a new loop at `now`. The first tick fires one interval later.
    pub fn restart(&mut self, now: Instant) -> Epoch {
        self.epoch += 1;
        self.last_tick = Some(now);
        Epoch(self.epoch)
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        epoch.0 == self.epoch
    }

    /// Accepts a tick when `interval` has passed since the last accepted one.
    /// Stale epochs never tick.
    pub fn poll(&mut self, epoch: Epoch, now: Instant, interval: Duration) -> bool {
        if !self.is_current(epoch) {
            return false;
        }

        let due = match self.last_tick {
            Some(last) => now.saturating_duration_since(last) >= interval,
            None => true,
        };

        if due {
            self.last_tick = Some(now);
        }
        due
    }
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new()
    }
}
