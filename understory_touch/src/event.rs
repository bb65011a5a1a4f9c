// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch events as delivered to recognizers.
//!
//! A platform layer produces [`TouchBatch`] values: every point that changed
//! (or stayed put) at one instant, stamped with a monotonic millisecond clock.
//! The [`TouchSurface`](crate::surface::TouchSurface) slices those batches per
//! recipient and wraps them in [`GestureEvent`] together with the ownership
//! notifications coming from the [`TouchBroker`](crate::broker::TouchBroker).
//!
//! ```
//! use kurbo::Point;
//! use understory_touch::event::{TouchBatch, TouchId, TouchPhase, TouchPhases, TouchPoint};
//!
//! let batch = TouchBatch::new(16)
//!     .with_point(TouchPoint::new(TouchId(1), TouchPhase::Moved, Point::new(4.0, 0.0)))
//!     .with_point(TouchPoint::new(TouchId(2), TouchPhase::Pressed, Point::new(40.0, 8.0)));
//!
//! assert!(batch.phases().contains(TouchPhases::PRESSED));
//! assert_eq!(batch.pressed().count(), 1);
//! assert_eq!(batch.point(TouchId(1)).map(|p| p.phase), Some(TouchPhase::Moved));
//! ```

use bitflags::bitflags;
use kurbo::{Affine, Point};
use smallvec::SmallVec;

/// Handle of one press-to-release cycle of a finger.
///
/// The platform may hand out the same value again for a later press, but
/// never while the previous press is still tracked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TouchId(pub u32);

/// Phase of a single touch point within a batch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// The finger landed in this batch.
    Pressed,
    /// The finger moved since the previous batch.
    Moved,
    /// The finger is down but did not move.
    Stationary,
    /// The finger lifted in this batch.
    Released,
}

bitflags! {
    /// Set of [`TouchPhase`] values present in a batch.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TouchPhases: u8 {
        /// At least one point was pressed.
        const PRESSED = 1 << 0;
        /// At least one point moved.
        const MOVED = 1 << 1;
        /// At least one point was stationary.
        const STATIONARY = 1 << 2;
        /// At least one point was released.
        const RELEASED = 1 << 3;
    }
}

impl TouchPhase {
    /// Returns the flag corresponding to this phase.
    #[must_use]
    pub const fn flag(self) -> TouchPhases {
        match self {
            Self::Pressed => TouchPhases::PRESSED,
            Self::Moved => TouchPhases::MOVED,
            Self::Stationary => TouchPhases::STATIONARY,
            Self::Released => TouchPhases::RELEASED,
        }
    }
}

/// One finger's state within a [`TouchBatch`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TouchPoint {
    /// Which press this point belongs to.
    pub id: TouchId,
    /// What happened to the point in this batch.
    pub phase: TouchPhase,
    /// Position in the receiving item's local coordinates.
    pub pos: Point,
    /// Position in the top-level surface's coordinates.
    pub scene_pos: Point,
}

impl TouchPoint {
    /// Creates a point whose local position equals its scene position.
    ///
    /// The surface localizes points for each recipient, see [`TouchPoint::localized`].
    #[must_use]
    pub fn new(id: TouchId, phase: TouchPhase, scene_pos: Point) -> Self {
        Self {
            id,
            phase,
            pos: scene_pos,
            scene_pos,
        }
    }

    /// Overrides the local position.
    #[must_use]
    pub fn with_pos(mut self, pos: Point) -> Self {
        self.pos = pos;
        self
    }

    /// Recomputes the local position for an item whose local→scene transform is `to_scene`.
    #[must_use]
    pub fn localized(mut self, to_scene: Affine) -> Self {
        self.pos = to_scene.inverse() * self.scene_pos;
        self
    }
}

/// Most batches carry one or two fingers.
const INLINE_POINTS: usize = 4;

/// All touch points reported by the platform at one instant.
///
/// A batch marked as a cancel batch carries no points: the platform aborted
/// every touch in flight, so any tracked touch vanishes without a release.
#[derive(Clone, Debug, PartialEq)]
pub struct TouchBatch {
    time_ms: u64,
    points: SmallVec<[TouchPoint; INLINE_POINTS]>,
    cancelled: bool,
}

impl TouchBatch {
    /// Creates an empty batch stamped with `time_ms`.
    #[must_use]
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms,
            points: SmallVec::new(),
            cancelled: false,
        }
    }

    /// Creates a cancel batch stamped with `time_ms`.
    #[must_use]
    pub fn cancel(time_ms: u64) -> Self {
        Self {
            time_ms,
            points: SmallVec::new(),
            cancelled: true,
        }
    }

    /// Single-point batch with a [`TouchPhase::Pressed`] point.
    #[must_use]
    pub fn press(time_ms: u64, id: TouchId, scene_pos: Point) -> Self {
        Self::new(time_ms).with_point(TouchPoint::new(id, TouchPhase::Pressed, scene_pos))
    }

    /// Single-point batch with a [`TouchPhase::Moved`] point.
    #[must_use]
    pub fn moved(time_ms: u64, id: TouchId, scene_pos: Point) -> Self {
        Self::new(time_ms).with_point(TouchPoint::new(id, TouchPhase::Moved, scene_pos))
    }

    /// Single-point batch with a [`TouchPhase::Released`] point.
    #[must_use]
    pub fn release(time_ms: u64, id: TouchId, scene_pos: Point) -> Self {
        Self::new(time_ms).with_point(TouchPoint::new(id, TouchPhase::Released, scene_pos))
    }

    /// Appends a point, builder style.
    #[must_use]
    pub fn with_point(mut self, point: TouchPoint) -> Self {
        self.push(point);
        self
    }

    /// Appends a point.
    pub fn push(&mut self, point: TouchPoint) {
        self.points.push(point);
    }

    /// Returns the monotonic timestamp of this batch in milliseconds.
    #[must_use]
    pub fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Returns the points in this batch, in platform order.
    #[must_use]
    pub fn points(&self) -> &[TouchPoint] {
        &self.points
    }

    /// Returns `true` if this is a cancel batch.
    #[must_use]
    pub fn is_cancel(&self) -> bool {
        self.cancelled
    }

    /// Returns `true` if the batch carries no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the union of the phases of every point.
    #[must_use]
    pub fn phases(&self) -> TouchPhases {
        self.points
            .iter()
            .fold(TouchPhases::empty(), |acc, p| acc | p.phase.flag())
    }

    /// Finds the point belonging to `id`.
    #[must_use]
    pub fn point(&self, id: TouchId) -> Option<&TouchPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    /// Iterates over the points that were pressed in this batch.
    pub fn pressed(&self) -> impl Iterator<Item = &TouchPoint> + '_ {
        self.points
            .iter()
            .filter(|p| p.phase == TouchPhase::Pressed)
    }

    /// Returns a batch with the same timestamp holding only the points accepted by `keep`.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&TouchPoint) -> bool) -> Self {
        Self {
            time_ms: self.time_ms,
            points: self.points.iter().copied().filter(|p| keep(p)).collect(),
            cancelled: self.cancelled,
        }
    }

    /// Returns a batch with the same timestamp holding only the points in `ids`.
    #[must_use]
    pub fn subset(&self, ids: &[TouchId]) -> Self {
        self.filtered(|p| ids.contains(&p.id))
    }

    /// Returns a copy whose local positions are expressed in an item's coordinates.
    #[must_use]
    pub fn localized(&self, to_scene: Affine) -> Self {
        if to_scene == Affine::IDENTITY {
            return self.clone();
        }
        Self {
            time_ms: self.time_ms,
            points: self.points.iter().map(|p| p.localized(to_scene)).collect(),
            cancelled: self.cancelled,
        }
    }
}

/// Everything a recognizer can be told by the surface it lives on.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureEvent {
    /// Points delivered directly: new presses offered to the recognizer and
    /// the touches it owns.
    Touch(TouchBatch),
    /// Points of touches nobody owns yet that the recognizer is a candidate
    /// for, plus points of touches it watches.
    UnownedTouch(TouchBatch),
    /// The broker granted ownership of the touch.
    OwnershipGained(TouchId),
    /// The broker gave the touch to another recognizer.
    OwnershipLost(TouchId),
    /// The recognizer's recognition timer ran out.
    RecognitionTimeout,
}
