// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Damped values: filter jitter out of touch positions.
//!
//! A damped value trails its raw input by at most `max_delta`. Raw samples
//! that stay within `max_delta` of the stored value do not move it at all;
//! larger moves drag it along, keeping it exactly `max_delta` behind. A single
//! noisy sample therefore cannot flip the sign of a movement vector, which
//! matters for direction checks that look at consecutive samples.
//!
//! ```
//! use understory_drag_gesture::damped::DampedValue;
//!
//! let mut v = DampedValue::new(2.0);
//! v.reset(10.0);
//! assert_eq!(v.update(11.5), 10.0); // within the dead zone
//! assert_eq!(v.update(15.0), 13.0); // trails by max_delta
//! assert_eq!(v.update(12.0), 13.0); // turning back inside the dead zone
//! assert_eq!(v.update(5.0), 7.0);
//! ```

use kurbo::Point;

/// A scalar that lags its input by at most `max_delta`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DampedValue {
    value: f64,
    max_delta: f64,
}

impl DampedValue {
    /// Creates a damped value at zero.
    ///
    /// Negative deltas are treated as zero.
    #[must_use]
    pub fn new(max_delta: f64) -> Self {
        let mut damped = Self::default();
        damped.set_max_delta(max_delta);
        damped
    }

    /// Returns the filtered value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns the allowed lag.
    #[must_use]
    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }

    /// Changes the allowed lag. Negative values are clamped to zero.
    pub fn set_max_delta(&mut self, max_delta: f64) {
        if max_delta < 0.0 {
            log::warn!("damping max delta cannot be negative ({max_delta}), using 0");
            self.max_delta = 0.0;
        } else {
            self.max_delta = max_delta;
        }
    }

    /// Jumps to `value` without filtering.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }

    /// Feeds a raw sample and returns the filtered value.
    pub fn update(&mut self, raw: f64) -> f64 {
        let delta = raw - self.value;
        if delta > self.max_delta {
            self.value += delta - self.max_delta;
        } else if delta < -self.max_delta {
            self.value += delta + self.max_delta;
        }
        self.value
    }
}

/// A point whose coordinates are damped independently.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DampedPoint {
    x: DampedValue,
    y: DampedValue,
}

impl DampedPoint {
    /// Creates a damped point at the origin.
    #[must_use]
    pub fn new(max_delta: f64) -> Self {
        Self {
            x: DampedValue::new(max_delta),
            y: DampedValue::new(max_delta),
        }
    }

    /// Returns the filtered point.
    #[must_use]
    pub fn value(&self) -> Point {
        Point::new(self.x.value(), self.y.value())
    }

    /// Returns the allowed lag per axis.
    #[must_use]
    pub fn max_delta(&self) -> f64 {
        self.x.max_delta()
    }

    /// Changes the allowed lag per axis.
    pub fn set_max_delta(&mut self, max_delta: f64) {
        self.x.set_max_delta(max_delta);
        self.y.set_max_delta(max_delta);
    }

    /// Jumps to `point` without filtering.
    pub fn reset(&mut self, point: Point) {
        self.x.reset(point.x);
        self.y.reset(point.y);
    }

    /// Feeds a raw sample and returns the filtered point.
    pub fn update(&mut self, raw: Point) -> Point {
        Point::new(self.x.update(raw.x), self.y.update(raw.y))
    }
}
