//! Leading-edge throttle with a trailing flush
//!
//! The first call in a window goes through immediately. Calls inside the window
//! are remembered, and [`Throttle::poll`] releases one trailing call once the
//! window has passed, so the last state always gets through. Time is passed in
//! by the caller.

use core::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last_fired: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
            pending: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a call at `now` may fire. A refused call is kept pending.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.is_open(now) {
            self.last_fired = Some(now);
            self.pending = false;
            true
        } else {
            self.pending = true;
            false
        }
    }

    /// Whether a pending call should fire now
    pub fn poll(&mut self, now: Instant) -> bool {
        self.pending && self.try_fire(now)
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Drop any pending call, e.g. when an unthrottled event supersedes it
    pub fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn is_open(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        }
    }
}
