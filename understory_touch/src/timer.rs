// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative single-shot timer.
//!
//! Nothing runs in the background: the event loop asks each recognizer for
//! its [`RecognitionTimer::deadline`] and delivers a timeout once the clock
//! passes it (see [`TouchSurface::advance_to`](crate::surface::TouchSurface::advance_to)).
//!
//! ```
//! use understory_touch::timer::RecognitionTimer;
//!
//! let mut timer = RecognitionTimer::new(400);
//! timer.start(1_000);
//! assert_eq!(timer.deadline(), Some(1_400));
//! assert!(!timer.is_expired(1_399));
//! assert!(timer.is_expired(1_400));
//! timer.stop();
//! assert!(!timer.is_expired(5_000));
//! ```

/// Deadline-based single-shot timer driven by an external clock.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RecognitionTimer {
    interval_ms: u64,
    started_at_ms: Option<u64>,
}

impl RecognitionTimer {
    /// Creates a stopped timer with the given interval.
    #[must_use]
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            started_at_ms: None,
        }
    }

    /// Returns the interval in milliseconds.
    #[must_use]
    pub const fn interval(&self) -> u64 {
        self.interval_ms
    }

    /// Changes the interval. A running timer keeps its start time, so its deadline moves.
    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval_ms = interval_ms;
    }

    /// (Re)starts the timer at `now_ms`.
    pub fn start(&mut self, now_ms: u64) {
        self.started_at_ms = Some(now_ms);
    }

    /// Stops the timer; a stopped timer never expires.
    pub fn stop(&mut self) {
        self.started_at_ms = None;
    }

    /// Returns `true` between [`start`](Self::start) and [`stop`](Self::stop).
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Returns the time at which a running timer fires.
    #[must_use]
    pub fn deadline(&self) -> Option<u64> {
        self.started_at_ms
            .map(|start| start.saturating_add(self.interval_ms))
    }

    /// Returns `true` if the timer is running and `now_ms` reached its deadline.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.deadline().is_some_and(|deadline| now_ms >= deadline)
    }
}
