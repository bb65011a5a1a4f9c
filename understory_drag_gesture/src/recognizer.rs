// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The drag recognizer: a [`TouchHandler`] that claims single-finger drags.
//!
//! ## States
//!
//! - [`Status::WaitingForTouch`]: idle. A lone press, outside the composition
//!   window of earlier presses, makes the recognizer a candidate owner of the
//!   touch and moves it to `Undecided`. Any other press is watched instead.
//! - [`Status::Undecided`]: the touch is evaluated from
//!   [`GestureEvent::UnownedTouch`] samples. Moving against the direction,
//!   beyond `max_distance`, past `max_time_ms`, or adding fingers within the
//!   composition window rejects it. Travelling more than `distance_threshold`
//!   along the direction requests ownership and recognizes it.
//! - [`Status::Recognized`]: the recognizer owns the touch and follows it
//!   until release. Other fingers pressed meanwhile are only watched.
//!
//! A rejected touch is watched, so the recognizer still learns when it ends
//! and keeps its record of pressed touches accurate.
//!
//! Changes of observable properties are queued as [`DragChange`] values and
//! drained with [`DragGesture::take_changes`].
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::Point;
//! use understory_drag_gesture::config::DragConfig;
//! use understory_drag_gesture::recognizer::{DragGesture, Status};
//! use understory_touch::event::{TouchBatch, TouchId};
//! use understory_touch::surface::TouchSurface;
//!
//! let config = DragConfig::default()
//!     .with_distance_threshold(10.0)
//!     .with_composition_time(0);
//! let mut surface = TouchSurface::new();
//! let drag = surface.add_handler(DragGesture::new(config));
//!
//! surface.dispatch(&TouchBatch::press(0, TouchId(7), Point::new(0.0, 0.0)));
//! assert_eq!(surface.handler(drag).unwrap().status(), Status::Undecided);
//!
//! surface.dispatch(&TouchBatch::moved(10, TouchId(7), Point::new(20.0, 0.0)));
//! assert_eq!(surface.handler(drag).unwrap().status(), Status::Recognized);
//! assert_eq!(surface.broker().owner(TouchId(7)), Some(drag));
//! ```

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::mem;

use kurbo::{Affine, Point, Vec2};
use understory_touch::active::ActiveTouches;
use understory_touch::event::{GestureEvent, TouchBatch, TouchId, TouchPhase, TouchPhases};
use understory_touch::surface::{TouchContext, TouchHandler, TouchOutcome};
use understory_touch::timer::RecognitionTimer;

use crate::config::DragConfig;
use crate::damped::DampedPoint;
use crate::direction::{Direction, project};

/// Weight of a new sample in the published position while dragging.
const POSITION_SMOOTHING: f64 = 0.4;

/// Recognition state of a [`DragGesture`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Status {
    /// No touch is being evaluated.
    #[default]
    WaitingForTouch,
    /// A touch is being evaluated.
    Undecided,
    /// The drag was recognized and the touch is owned.
    Recognized,
}

/// Change of an observable property of a [`DragGesture`].
///
/// Each is queued only when the value actually changes.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DragChange {
    /// New status.
    Status(Status),
    /// A touch started or stopped being evaluated or followed.
    Pressed(bool),
    /// Recognition happened or the recognized drag ended.
    Dragging(bool),
    /// New published position, local coordinates.
    TouchPos(Point),
    /// New published position, scene coordinates.
    TouchScenePos(Point),
    /// New distance from the start along the direction's axis, local coordinates.
    Distance(f64),
    /// New distance from the start along the direction, scene coordinates.
    SceneDistance(f64),
    /// New direction.
    Direction(Direction),
    /// Immediate recognition toggled.
    ImmediateRecognition(bool),
}

/// Shared "moving" flag of a scrolling view the drag lives next to.
///
/// While the companion reports movement, presses are not evaluated, so a
/// flick that is still scrolling cannot start a drag.
#[derive(Clone, Debug, Default)]
pub struct ScrollCompanion(Rc<Cell<bool>>);

impl ScrollCompanion {
    /// Creates a companion that is not moving.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the companion is moving.
    pub fn set_moving(&self, moving: bool) {
        self.0.set(moving);
    }

    /// Returns `true` while the companion is moving.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.0.get()
    }
}

/// Single-finger drag recognizer.
#[derive(Debug)]
pub struct DragGesture {
    config: DragConfig,
    status: Status,
    touch_id: Option<TouchId>,
    start_pos: Point,
    start_scene_pos: Point,
    damped_scene_pos: DampedPoint,
    last_damped_scene_pos: Point,
    touch_pos: Point,
    touch_scene_pos: Point,
    scene_distance: f64,
    scene_direction: Vec2,
    to_scene: Affine,
    active_touches: ActiveTouches,
    timer: RecognitionTimer,
    enabled: bool,
    visible: bool,
    companion: Option<ScrollCompanion>,
    changes: Vec<DragChange>,
}

impl Default for DragGesture {
    fn default() -> Self {
        Self::new(DragConfig::default())
    }
}

impl DragGesture {
    /// Creates an enabled, visible recognizer.
    #[must_use]
    pub fn new(config: DragConfig) -> Self {
        let mut damped_scene_pos = DampedPoint::new(config.damping);
        damped_scene_pos.reset(Point::ZERO);
        Self {
            config,
            status: Status::WaitingForTouch,
            touch_id: None,
            start_pos: Point::ZERO,
            start_scene_pos: Point::ZERO,
            damped_scene_pos,
            last_damped_scene_pos: Point::ZERO,
            touch_pos: Point::ZERO,
            touch_scene_pos: Point::ZERO,
            scene_distance: 0.0,
            scene_direction: config.direction.scene_vector(Affine::IDENTITY),
            to_scene: Affine::IDENTITY,
            active_touches: ActiveTouches::new(),
            timer: RecognitionTimer::new(config.max_time_ms),
            enabled: true,
            visible: true,
            companion: None,
            changes: Vec::new(),
        }
    }

    /// Places the recognizer in an item mapped to the scene by `to_scene`.
    #[must_use]
    pub fn with_scene_transform(mut self, to_scene: Affine) -> Self {
        self.set_scene_transform(to_scene);
        self
    }

    /// Links a scrolling companion.
    #[must_use]
    pub fn with_scroll_companion(mut self, companion: ScrollCompanion) -> Self {
        self.companion = Some(companion);
        self
    }

    /// Returns the current parameters.
    #[must_use]
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Returns the recognition state.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns the touch being evaluated or followed.
    #[must_use]
    pub fn touch_id(&self) -> Option<TouchId> {
        self.touch_id.filter(|_| self.status != Status::WaitingForTouch)
    }

    /// Returns `true` while a touch is evaluated or followed.
    #[must_use]
    pub fn pressed(&self) -> bool {
        self.status != Status::WaitingForTouch
    }

    /// Returns `true` once the drag is recognized.
    #[must_use]
    pub fn dragging(&self) -> bool {
        self.status == Status::Recognized
    }

    /// Published touch position, local coordinates.
    ///
    /// Smoothed while dragging, unless recognition is disabled.
    #[must_use]
    pub fn touch_pos(&self) -> Point {
        self.touch_pos
    }

    /// Published touch position, scene coordinates.
    #[must_use]
    pub fn touch_scene_pos(&self) -> Point {
        self.touch_scene_pos
    }

    /// Distance from the press along the direction's axis, local coordinates.
    ///
    /// Signed by the axis, not by the direction: a leftwards drag has a
    /// negative distance.
    #[must_use]
    pub fn distance(&self) -> f64 {
        if self.config.direction.is_horizontal() {
            self.touch_pos.x - self.start_pos.x
        } else {
            self.touch_pos.y - self.start_pos.y
        }
    }

    /// Distance from the press along the direction, scene coordinates.
    #[must_use]
    pub fn scene_distance(&self) -> f64 {
        self.scene_distance
    }

    /// Unit vector of the direction in scene space.
    #[must_use]
    pub fn scene_direction(&self) -> Vec2 {
        self.scene_direction
    }

    /// Returns the local→scene transform.
    #[must_use]
    pub fn to_scene(&self) -> Affine {
        self.to_scene
    }

    /// Returns the pressed touches this recognizer knows of.
    #[must_use]
    pub fn active_touches(&self) -> &ActiveTouches {
        &self.active_touches
    }

    /// Returns `true` if the recognizer reacts to presses.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` if the recognizer's item is shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Queued property changes, oldest first.
    #[must_use]
    pub fn changes(&self) -> &[DragChange] {
        &self.changes
    }

    /// Drains the queued property changes.
    pub fn take_changes(&mut self) -> Vec<DragChange> {
        mem::take(&mut self.changes)
    }

    /// Changes the direction.
    pub fn set_direction(&mut self, direction: Direction) {
        if self.config.direction == direction {
            return;
        }
        self.config.direction = direction;
        self.update_scene_direction();
        self.changes.push(DragChange::Direction(direction));
    }

    /// Toggles immediate recognition.
    pub fn set_immediate_recognition(&mut self, immediate: bool) {
        if self.config.immediate_recognition == immediate {
            return;
        }
        self.config.immediate_recognition = immediate;
        self.changes.push(DragChange::ImmediateRecognition(immediate));
    }

    /// Changes the distance threshold.
    pub fn set_distance_threshold(&mut self, distance: f64) {
        self.config.distance_threshold = distance;
    }

    /// Changes the rejection distance.
    pub fn set_max_distance(&mut self, distance: f64) {
        self.config.max_distance = distance;
    }

    /// Changes the damping.
    pub fn set_damping(&mut self, damping: f64) {
        self.config.damping = damping;
        self.damped_scene_pos.set_max_delta(damping);
    }

    /// Changes the composition window.
    pub fn set_composition_time(&mut self, ms: u64) {
        self.config.composition_time_ms = ms;
    }

    /// Changes the recognition time limit.
    pub fn set_max_time(&mut self, ms: u64) {
        self.config.max_time_ms = ms;
        self.timer.set_interval(ms);
    }

    /// Rescales the geometric parameters for a display density.
    pub fn set_pixels_per_mm(&mut self, pixels_per_mm: f64) {
        self.config = self.config.scaled_to_density(pixels_per_mm);
        self.damped_scene_pos.set_max_delta(self.config.damping);
    }

    /// Removes the composition window and stretches the time limit to an hour.
    pub fn remove_time_constraints(&mut self) {
        self.config = self.config.without_time_constraints();
        self.timer.set_interval(self.config.max_time_ms);
        log::debug!("drag gesture time constraints removed");
    }

    /// Moves the recognizer's item.
    pub fn set_scene_transform(&mut self, to_scene: Affine) {
        self.to_scene = to_scene;
        self.update_scene_direction();
    }

    /// Links or unlinks a scrolling companion.
    pub fn set_scroll_companion(&mut self, companion: Option<ScrollCompanion>) {
        self.companion = companion;
    }

    /// Enables or disables the recognizer. Disabling abandons any gesture in progress.
    pub fn set_enabled(&mut self, cx: &mut TouchContext<'_>, enabled: bool) {
        self.enabled = enabled;
        self.give_up_if_disabled_or_invisible(cx);
    }

    /// Shows or hides the recognizer. Hiding abandons any gesture in progress.
    pub fn set_visible(&mut self, cx: &mut TouchContext<'_>, visible: bool) {
        self.visible = visible;
        self.give_up_if_disabled_or_invisible(cx);
    }

    fn give_up_if_disabled_or_invisible(&mut self, cx: &mut TouchContext<'_>) {
        if self.enabled && self.visible {
            return;
        }
        if self.status == Status::Undecided {
            self.withdraw_and_watch(cx);
        }
        if self.status != Status::WaitingForTouch {
            log::debug!("drag gesture disabled or hidden, giving up");
            self.set_status(Status::WaitingForTouch, cx.now_ms());
        }
    }

    fn touch_event(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) -> TouchOutcome {
        if batch.is_cancel() {
            self.cancel_gesture(cx.now_ms());
            return TouchOutcome::Ignored;
        }
        if !self.enabled || !self.visible {
            return TouchOutcome::Ignored;
        }
        let outcome = match self.status {
            Status::WaitingForTouch => self.touch_event_waiting(cx, batch),
            Status::Undecided => self.touch_event_undecided(cx, batch),
            Status::Recognized => self.touch_event_recognized(cx, batch),
        };
        self.active_touches.update(batch);
        outcome
    }

    fn touch_event_waiting(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) -> TouchOutcome {
        if !batch.phases().contains(TouchPhases::PRESSED) {
            return TouchOutcome::Ignored;
        }
        let now = cx.now_ms();
        let mut pressed = batch.pressed();
        let candidate = pressed.next().copied();
        let lone_press = pressed.next().is_none();

        let acceptable = if self.is_within_composition_window(now) {
            log::debug!("press within composition window of earlier touches, not a drag");
            false
        } else if let Some(held) = cx.broker().owned_live_touch(cx.handler()) {
            log::debug!("still owning {held:?}, leaving the press to others");
            false
        } else if !lone_press {
            log::debug!("more than one touch pressed, not a drag");
            false
        } else if self.companion.as_ref().is_some_and(ScrollCompanion::is_moving) {
            log::debug!("scroll companion is moving, ignoring press");
            false
        } else if let Err(err) = self.config.validate() {
            log::warn!("drag gesture cannot recognize anything: {err}");
            false
        } else {
            true
        };

        let Some(point) = candidate.filter(|_| acceptable) else {
            Self::watch_pressed(cx, batch);
            return TouchOutcome::Ignored;
        };

        self.touch_id = Some(point.id);
        self.start_pos = point.pos;
        self.start_scene_pos = point.scene_pos;
        self.damped_scene_pos.reset(point.scene_pos);
        self.last_damped_scene_pos = point.scene_pos;
        self.update_scene_direction();
        self.set_touch_pos(point.pos);
        self.set_touch_scene_pos(point.scene_pos);

        if self.config.recognition_disabled() {
            log::debug!("recognition disabled, claiming {:?} on press", point.id);
            cx.request_ownership(point.id);
            self.set_status(Status::Recognized, now);
            TouchOutcome::Accepted
        } else {
            cx.add_candidate_owner(point.id);
            self.set_status(Status::Undecided, now);
            TouchOutcome::Ignored
        }
    }

    fn touch_event_undecided(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) -> TouchOutcome {
        // Presses arriving now belong to someone else; only their end matters.
        Self::watch_pressed(cx, batch);
        if batch.phases().contains(TouchPhases::PRESSED)
            && self.is_within_composition_window(cx.now_ms())
        {
            log::debug!("further touch within composition window, not a single-finger drag");
            self.withdraw_and_watch(cx);
            self.set_status(Status::WaitingForTouch, cx.now_ms());
        }
        TouchOutcome::Ignored
    }

    fn touch_event_recognized(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) -> TouchOutcome {
        let Some(id) = self.touch_id else {
            self.set_status(Status::WaitingForTouch, cx.now_ms());
            return TouchOutcome::Ignored;
        };
        let Some(point) = batch.point(id).copied() else {
            log::error!("{id:?} vanished from an owned batch without a release, treating it as released");
            self.set_status(Status::WaitingForTouch, cx.now_ms());
            return TouchOutcome::Ignored;
        };
        // Other fingers landing mid-drag are left to the rest of the surface.
        Self::watch_pressed(cx, batch);
        self.sample_damped(point.scene_pos);
        self.set_touch_pos(point.pos);
        self.set_touch_scene_pos(point.scene_pos);
        if point.phase == TouchPhase::Released {
            self.set_status(Status::WaitingForTouch, cx.now_ms());
        }
        TouchOutcome::Ignored
    }

    fn unowned_touch_event(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) {
        if batch.is_cancel() {
            self.cancel_gesture(cx.now_ms());
            return;
        }
        if self.status == Status::Undecided {
            self.unowned_touch_event_undecided(cx, batch);
        }
        self.active_touches.update(batch);
    }

    fn unowned_touch_event_undecided(&mut self, cx: &mut TouchContext<'_>, batch: &TouchBatch) {
        let now = cx.now_ms();
        let Some(id) = self.touch_id else {
            self.set_status(Status::WaitingForTouch, now);
            return;
        };
        let Some(point) = batch.point(id).copied() else {
            log::error!("{id:?} vanished from an unowned batch without a release, treating it as released");
            cx.remove_candidate_owner(id);
            self.set_status(Status::WaitingForTouch, now);
            return;
        };
        if point.phase == TouchPhase::Released {
            log::debug!("{id:?} released before recognition");
            cx.remove_candidate_owner(id);
            self.set_status(Status::WaitingForTouch, now);
            return;
        }

        let movement = self.sample_damped(point.scene_pos);
        if !self.moving_in_right_direction(movement) {
            log::debug!("{id:?} moved against {:?}, rejecting", self.config.direction);
            self.withdraw_and_watch(cx);
            self.set_status(Status::WaitingForTouch, now);
            return;
        }
        if self.is_within_composition_window(now) {
            log::trace!("{id:?} still within composition window");
            return;
        }

        let offset = self.last_damped_scene_pos - self.start_scene_pos;
        if self.moved_far_enough(offset) {
            log::debug!("drag recognized for {id:?}");
            cx.request_ownership(id);
            self.set_status(Status::Recognized, now);
            self.set_touch_pos(point.pos);
            self.set_touch_scene_pos(point.scene_pos);
        } else if self.is_past_max_distance(offset) {
            log::debug!("{id:?} went past max distance without enough progress, rejecting");
            self.withdraw_and_watch(cx);
            self.set_status(Status::WaitingForTouch, now);
        }
    }

    fn ownership_lost(&mut self, cx: &mut TouchContext<'_>, touch: TouchId) {
        if self.touch_id != Some(touch) || self.status == Status::WaitingForTouch {
            return;
        }
        log::debug!("{touch:?} was claimed by another recognizer");
        cx.add_watcher(touch);
        self.set_status(Status::WaitingForTouch, cx.now_ms());
    }

    fn recognition_timed_out(&mut self, cx: &mut TouchContext<'_>) {
        if self.status != Status::Undecided {
            return;
        }
        log::debug!("drag not recognized within {} ms", self.config.max_time_ms);
        self.withdraw_and_watch(cx);
        self.set_status(Status::WaitingForTouch, cx.now_ms());
    }

    fn cancel_gesture(&mut self, now: u64) {
        if self.status != Status::WaitingForTouch {
            log::debug!("touch sequence cancelled");
            self.set_status(Status::WaitingForTouch, now);
        }
        self.active_touches.clear();
    }

    fn withdraw_and_watch(&mut self, cx: &mut TouchContext<'_>) {
        if let Some(id) = self.touch_id {
            cx.remove_candidate_owner(id);
            cx.add_watcher(id);
        }
    }

    /// Feeds a scene sample through the damping filter and returns the
    /// filtered movement since the previous sample.
    fn sample_damped(&mut self, scene_pos: Point) -> Vec2 {
        let damped = self.damped_scene_pos.update(scene_pos);
        let movement = damped - self.last_damped_scene_pos;
        self.last_damped_scene_pos = damped;
        movement
    }

    fn watch_pressed(cx: &mut TouchContext<'_>, batch: &TouchBatch) {
        for point in batch.pressed() {
            cx.add_watcher(point.id);
        }
    }

    fn is_within_composition_window(&self, now: u64) -> bool {
        let window = self.config.composition_time_ms;
        window > 0
            && self
                .active_touches
                .most_recent_start_time()
                .is_some_and(|start| now <= start.saturating_add(window))
    }

    fn moving_in_right_direction(&self, movement: Vec2) -> bool {
        !self.config.direction.is_signed() || project(movement, self.scene_direction) >= 0.0
    }

    fn moved_far_enough(&self, offset: Vec2) -> bool {
        let threshold = self.config.distance_threshold;
        if threshold <= 0.0 {
            return true;
        }
        let along = project(offset, self.scene_direction);
        if self.config.direction.is_signed() {
            along > threshold
        } else {
            along > threshold || -along > threshold
        }
    }

    fn is_past_max_distance(&self, offset: Vec2) -> bool {
        let max = self.config.max_distance;
        offset.hypot2() > max * max
    }

    fn update_scene_direction(&mut self) {
        self.scene_direction = self.config.direction.scene_vector(self.to_scene);
    }

    fn set_status(&mut self, status: Status, now: u64) {
        if self.status == status {
            return;
        }
        let previous = self.status;
        if previous == Status::Undecided {
            self.timer.stop();
        }
        self.status = status;
        log::trace!("drag gesture {previous:?} -> {status:?}");
        self.changes.push(DragChange::Status(status));

        match status {
            Status::WaitingForTouch => {
                if previous == Status::Recognized {
                    self.changes.push(DragChange::Dragging(false));
                }
                self.changes.push(DragChange::Pressed(false));
            }
            Status::Undecided => {
                self.timer.start(now);
                self.changes.push(DragChange::Pressed(true));
            }
            Status::Recognized => {
                if previous == Status::WaitingForTouch {
                    self.changes.push(DragChange::Pressed(true));
                }
                self.changes.push(DragChange::Dragging(true));
            }
        }
    }

    fn set_touch_pos(&mut self, raw: Point) {
        let smooth = self.status == Status::Recognized && !self.config.recognition_disabled();
        let pos = if smooth {
            self.touch_pos + (raw - self.touch_pos) * POSITION_SMOOTHING
        } else {
            raw
        };
        if pos == self.touch_pos {
            return;
        }
        let previous = self.touch_pos;
        self.touch_pos = pos;
        self.changes.push(DragChange::TouchPos(pos));
        let axis_changed = if self.config.direction.is_horizontal() {
            pos.x != previous.x
        } else {
            pos.y != previous.y
        };
        if axis_changed {
            self.changes.push(DragChange::Distance(self.distance()));
        }
    }

    fn set_touch_scene_pos(&mut self, raw: Point) {
        let smooth = self.status == Status::Recognized && !self.config.recognition_disabled();
        let pos = if smooth {
            self.touch_scene_pos + (raw - self.touch_scene_pos) * POSITION_SMOOTHING
        } else {
            raw
        };
        if pos == self.touch_scene_pos {
            return;
        }
        self.touch_scene_pos = pos;
        self.changes.push(DragChange::TouchScenePos(pos));
        let distance = project(pos - self.start_scene_pos, self.scene_direction);
        if distance != self.scene_distance {
            self.scene_distance = distance;
            self.changes.push(DragChange::SceneDistance(distance));
        }
    }
}

impl TouchHandler for DragGesture {
    fn handle_event(&mut self, cx: &mut TouchContext<'_>, event: GestureEvent) -> TouchOutcome {
        match event {
            GestureEvent::Touch(batch) => self.touch_event(cx, &batch),
            GestureEvent::UnownedTouch(batch) => {
                self.unowned_touch_event(cx, &batch);
                TouchOutcome::Ignored
            }
            GestureEvent::OwnershipGained(touch) => {
                log::debug!("drag gesture now owns {touch:?}");
                TouchOutcome::Accepted
            }
            GestureEvent::OwnershipLost(touch) => {
                self.ownership_lost(cx, touch);
                TouchOutcome::Ignored
            }
            GestureEvent::RecognitionTimeout => {
                self.recognition_timed_out(cx);
                TouchOutcome::Ignored
            }
        }
    }

    fn scene_transform(&self) -> Affine {
        self.to_scene
    }

    fn timer_deadline(&self) -> Option<u64> {
        self.timer.deadline()
    }
}
