//! Match clock derived from a start reference and the caller's "now".
//!
//! The clock never reads system time. Callers pass `now_ms` on every query,
//! which keeps replays exact and lets tests jump time freely.

use serde::{Deserialize, Serialize};

/// Elapsed-time tracker for one match.
///
/// Elapsed time is `base_ms` plus the time since `running_since_ms` while the
/// clock runs. No state depends on the absolute value of `now_ms`, so a clock
/// can be restored at any caller time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MatchClock {
    started: bool,
    /// Elapsed time accumulated before the current running stretch.
    base_ms: u64,
    /// Caller time the current running stretch began; `None` while frozen.
    running_since_ms: Option<u64>,
}

impl MatchClock {
    /// A clock that has not been started.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            started: false,
            base_ms: 0,
            running_since_ms: None,
        }
    }

    /// Start (or restart) counting from `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        self.started = true;
        self.base_ms = 0;
        self.running_since_ms = Some(now_ms);
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Whether the clock was started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the clock is frozen.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.started && self.running_since_ms.is_none()
    }

    /// Elapsed milliseconds at `now_ms`.
    ///
    /// A `now_ms` earlier than the current running stretch adds nothing.
    #[must_use]
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        let running = self
            .running_since_ms
            .map_or(0, |since| now_ms.saturating_sub(since));
        self.base_ms.saturating_add(running)
    }

    /// Elapsed whole seconds at `now_ms`.
    #[must_use]
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }

    /// Freeze elapsed time at its value for `now_ms`.
    pub fn pause(&mut self, now_ms: u64) {
        if self.running_since_ms.is_some() {
            self.base_ms = self.elapsed_ms(now_ms);
            self.running_since_ms = None;
        }
    }

    /// Continue from the frozen value; no time is gained or lost across the
    /// pause.
    pub fn resume(&mut self, now_ms: u64) {
        if self.is_paused() {
            self.running_since_ms = Some(now_ms);
        }
    }

    /// Freeze at exactly `elapsed_ms`, whatever the caller's time.
    pub fn freeze_at(&mut self, elapsed_ms: u64) {
        self.started = true;
        self.base_ms = elapsed_ms;
        self.running_since_ms = None;
    }

    /// Rebuild a clock that reads `elapsed_ms` at `now_ms`.
    #[must_use]
    pub const fn restored(elapsed_ms: u64, now_ms: u64, paused: bool) -> Self {
        Self {
            started: true,
            base_ms: elapsed_ms,
            running_since_ms: if paused { None } else { Some(now_ms) },
        }
    }
}
