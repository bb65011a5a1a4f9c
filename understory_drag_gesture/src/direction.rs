// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture directions and their geometry.

use kurbo::{Affine, Point, Vec2};

/// Direction a drag must follow to be recognized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Along the positive X axis.
    #[default]
    Rightwards,
    /// Along the negative X axis.
    Leftwards,
    /// Along the positive Y axis.
    Downwards,
    /// Along the negative Y axis.
    Upwards,
    /// Along the X axis, either way.
    Horizontal,
    /// Along the Y axis, either way.
    Vertical,
}

impl Direction {
    /// Returns `true` for directions along the X axis.
    #[must_use]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Leftwards | Self::Rightwards | Self::Horizontal)
    }

    /// Returns `true` for directions along the Y axis.
    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Upwards | Self::Downwards | Self::Vertical)
    }

    /// Returns `true` if the local unit vector points along a positive axis.
    ///
    /// The symmetric directions count as positive.
    #[must_use]
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            Self::Rightwards | Self::Downwards | Self::Horizontal | Self::Vertical
        )
    }

    /// Returns `true` if movement against the direction disqualifies a drag.
    #[must_use]
    pub fn is_signed(self) -> bool {
        !matches!(self, Self::Horizontal | Self::Vertical)
    }

    /// Unit vector of the direction in the item's local space.
    #[must_use]
    pub fn local_vector(self) -> Vec2 {
        match self {
            Self::Rightwards | Self::Horizontal => Vec2::new(1.0, 0.0),
            Self::Leftwards => Vec2::new(-1.0, 0.0),
            Self::Downwards | Self::Vertical => Vec2::new(0.0, 1.0),
            Self::Upwards => Vec2::new(0.0, -1.0),
        }
    }

    /// Unit vector of the direction in scene space, for an item mapped by `to_scene`.
    ///
    /// Falls back to the local vector if the transform collapses it.
    #[must_use]
    pub fn scene_vector(self, to_scene: Affine) -> Vec2 {
        let local = self.local_vector();
        let mapped = (to_scene * local.to_point()) - (to_scene * Point::ORIGIN);
        if mapped.hypot2() > 0.0 {
            mapped.normalize()
        } else {
            local
        }
    }
}

/// Scalar projection of `vector` onto the unit vector `direction`.
#[must_use]
pub fn project(vector: Vec2, direction: Vec2) -> f64 {
    vector.dot(direction)
}
