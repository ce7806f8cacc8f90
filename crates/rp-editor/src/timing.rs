//! Timestamp-driven timing primitives.
//!
//! The engine owns no timers. Every timed behavior is a value holding a
//! deadline that the caller checks against the current `Timestamp`, so
//! nothing depends on a timer being cancelled at the right moment.

use rp_core::Timestamp;

/// Transition lock: a token that is held until its expiry passes.
///
/// Acquiring sets the expiry `duration_ms` ahead; the token frees itself
/// once the deadline passes, whatever happened in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cooldown {
    duration_ms: f64,
    expires_at: Option<Timestamp>,
}

impl Cooldown {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms,
            expires_at: None,
        }
    }

    /// Whether the token is still held at `now`.
    pub fn is_held(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|t| now < t)
    }

    /// Acquire the token if free. Returns `false` (and changes nothing)
    /// while it is held.
    pub fn try_acquire(&mut self, now: Timestamp) -> bool {
        if self.is_held(now) {
            return false;
        }
        self.expires_at = Some(now.after(self.duration_ms));
        true
    }

    /// Take the token regardless of its state, restarting the cooldown.
    pub fn force(&mut self, now: Timestamp) {
        self.expires_at = Some(now.after(self.duration_ms));
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }
}

/// Fires once after a quiet period; re-arming pushes the deadline out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debouncer {
    quiet_ms: f64,
    deadline: Option<Timestamp>,
}

impl Debouncer {
    pub fn new(quiet_ms: f64) -> Self {
        Self {
            quiet_ms,
            deadline: None,
        }
    }

    /// (Re)start the quiet period. A pending firing is superseded.
    pub fn arm(&mut self, now: Timestamp) {
        self.deadline = Some(now.after(self.quiet_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Returns `true` exactly once when the deadline has passed.
    pub fn fire_if_due(&mut self, now: Timestamp) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Rate limiter: lets through at most one call per interval, dropping the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameThrottle {
    interval_ms: f64,
    last: Option<Timestamp>,
}

impl FrameThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    /// Whether a call at `now` may run. Records it when it may.
    pub fn allow(&mut self, now: Timestamp) -> bool {
        match self.last {
            Some(last) if now.millis() - last.millis() < self.interval_ms => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
