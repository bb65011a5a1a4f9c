// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recognition parameters for [`DragGesture`](crate::recognizer::DragGesture).
//!
//! Distances are in scene units (usually pixels) and times in milliseconds.
//! The geometric defaults are physical sizes scaled by the display density:
//!
//! | parameter            | default     |
//! |----------------------|-------------|
//! | `distance_threshold` | 4 mm        |
//! | `max_distance`       | 10 mm       |
//! | `damping`            | 1 mm        |
//! | `composition_time_ms`| 60          |
//! | `max_time_ms`        | 400         |
//!
//! ```
//! use understory_drag_gesture::config::DragConfig;
//! use understory_drag_gesture::direction::Direction;
//!
//! let config = DragConfig::for_density(10.0)
//!     .with_direction(Direction::Upwards)
//!     .with_composition_time(0);
//! assert_eq!(config.distance_threshold, 40.0);
//! assert_eq!(config.max_distance, 100.0);
//! assert!(config.validate().is_ok());
//! ```

use core::fmt;

use crate::direction::Direction;

/// Pixels per millimetre of a 96 DPI display.
pub const BASELINE_PIXELS_PER_MM: f64 = 96.0 / 25.4;

/// Default window, from the first press, in which further presses are treated as one gesture.
pub const DEFAULT_COMPOSITION_TIME_MS: u64 = 60;

/// Default time limit for recognition.
pub const DEFAULT_MAX_TIME_MS: u64 = 400;

/// Time limit used when time constraints are removed (one hour).
pub const UNLIMITED_MAX_TIME_MS: u64 = 60 * 60 * 1000;

const DISTANCE_THRESHOLD_MM: f64 = 4.0;
const MAX_DISTANCE_MM: f64 = 10.0;
const DAMPING_MM: f64 = 1.0;

/// Tunable recognition parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DragConfig {
    /// Direction the drag must follow.
    pub direction: Direction,
    /// Distance along the direction needed for recognition.
    pub distance_threshold: f64,
    /// Distance from the start beyond which an unrecognized drag is rejected.
    pub max_distance: f64,
    /// Maximum lag of the damped position, per axis.
    pub damping: f64,
    /// Window after the latest press during which recognition is postponed.
    pub composition_time_ms: u64,
    /// Time allowed from press to recognition.
    pub max_time_ms: u64,
    /// Claim the touch on press without evaluating it.
    pub immediate_recognition: bool,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self::for_density(BASELINE_PIXELS_PER_MM)
    }
}

impl DragConfig {
    /// Default parameters for a display with `pixels_per_mm` density.
    #[must_use]
    pub fn for_density(pixels_per_mm: f64) -> Self {
        Self {
            direction: Direction::default(),
            distance_threshold: 0.0,
            max_distance: 0.0,
            damping: 0.0,
            composition_time_ms: DEFAULT_COMPOSITION_TIME_MS,
            max_time_ms: DEFAULT_MAX_TIME_MS,
            immediate_recognition: false,
        }
        .scaled_to_density(pixels_per_mm)
    }

    /// Recomputes the geometric parameters for a new density.
    ///
    /// Times, direction and immediate recognition are kept.
    #[must_use]
    pub fn scaled_to_density(self, pixels_per_mm: f64) -> Self {
        Self {
            distance_threshold: DISTANCE_THRESHOLD_MM * pixels_per_mm,
            max_distance: MAX_DISTANCE_MM * pixels_per_mm,
            damping: DAMPING_MM * pixels_per_mm,
            ..self
        }
    }

    /// Sets the direction.
    #[must_use]
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Sets the distance threshold.
    #[must_use]
    pub fn with_distance_threshold(mut self, distance: f64) -> Self {
        self.distance_threshold = distance;
        self
    }

    /// Sets the rejection distance.
    #[must_use]
    pub fn with_max_distance(mut self, distance: f64) -> Self {
        self.max_distance = distance;
        self
    }

    /// Sets the damping.
    #[must_use]
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Sets the composition window.
    #[must_use]
    pub fn with_composition_time(mut self, ms: u64) -> Self {
        self.composition_time_ms = ms;
        self
    }

    /// Sets the recognition time limit.
    #[must_use]
    pub fn with_max_time(mut self, ms: u64) -> Self {
        self.max_time_ms = ms;
        self
    }

    /// Enables or disables immediate recognition.
    #[must_use]
    pub fn with_immediate_recognition(mut self, immediate: bool) -> Self {
        self.immediate_recognition = immediate;
        self
    }

    /// Removes the composition window and stretches the time limit to an hour.
    ///
    /// Useful for automated input that moves slower than a finger.
    #[must_use]
    pub fn without_time_constraints(self) -> Self {
        Self {
            composition_time_ms: 0,
            max_time_ms: UNLIMITED_MAX_TIME_MS,
            ..self
        }
    }

    /// Returns `true` if a press is claimed without evaluation.
    ///
    /// This is the case with immediate recognition, or with neither a
    /// distance threshold nor a composition window.
    #[must_use]
    pub fn recognition_disabled(&self) -> bool {
        self.immediate_recognition
            || (self.distance_threshold <= 0.0 && self.composition_time_ms == 0)
    }

    /// Checks that recognition can succeed with these parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.damping < 0.0 {
            return Err(ConfigError::NegativeDamping(self.damping));
        }
        if self.recognition_disabled() {
            return Ok(());
        }
        // Written as a positive comparison so NaN fails.
        let reachable = self.distance_threshold < self.max_distance;
        if !reachable {
            return Err(ConfigError::ThresholdNotBelowMaxDistance {
                threshold: self.distance_threshold,
                max_distance: self.max_distance,
            });
        }
        if self.composition_time_ms >= self.max_time_ms {
            return Err(ConfigError::CompositionNotBelowMaxTime {
                composition_ms: self.composition_time_ms,
                max_time_ms: self.max_time_ms,
            });
        }
        Ok(())
    }
}

/// Inconsistent recognition parameters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The drag would be rejected before it could be recognized.
    ThresholdNotBelowMaxDistance {
        /// Configured distance threshold.
        threshold: f64,
        /// Configured rejection distance.
        max_distance: f64,
    },
    /// The drag would time out before the composition window closes.
    CompositionNotBelowMaxTime {
        /// Configured composition window.
        composition_ms: u64,
        /// Configured time limit.
        max_time_ms: u64,
    },
    /// Damping must not be negative.
    NegativeDamping(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThresholdNotBelowMaxDistance {
                threshold,
                max_distance,
            } => write!(
                f,
                "distance threshold ({threshold}) must be less than max distance ({max_distance})"
            ),
            Self::CompositionNotBelowMaxTime {
                composition_ms,
                max_time_ms,
            } => write!(
                f,
                "composition time ({composition_ms} ms) must be less than max time ({max_time_ms} ms)"
            ),
            Self::NegativeDamping(damping) => write!(f, "damping ({damping}) must not be negative"),
        }
    }
}

impl core::error::Error for ConfigError {}
