// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end drag recognition on a touch surface.

use kurbo::{Affine, Point};
use understory_drag_gesture::config::DragConfig;
use understory_drag_gesture::direction::Direction;
use understory_drag_gesture::recognizer::{DragChange, DragGesture, ScrollCompanion, Status};
use understory_touch::event::{TouchBatch, TouchId, TouchPhase, TouchPoint};
use understory_touch::surface::{HandlerId, TouchHandler, TouchSurface};

const A: TouchId = TouchId(1);
const B: TouchId = TouchId(2);

fn config() -> DragConfig {
    DragConfig::default()
        .with_direction(Direction::Rightwards)
        .with_distance_threshold(10.0)
        .with_composition_time(0)
        .with_max_time(400)
}

fn surface_with(gestures: Vec<DragGesture>) -> (TouchSurface<DragGesture>, Vec<HandlerId>) {
    let mut surface = TouchSurface::new();
    let ids = gestures
        .into_iter()
        .map(|g| surface.add_handler(g))
        .collect();
    (surface, ids)
}

fn get(surface: &TouchSurface<DragGesture>, id: HandlerId) -> &DragGesture {
    surface.handler(id).unwrap()
}

fn take_changes(surface: &mut TouchSurface<DragGesture>, id: HandlerId) -> Vec<DragChange> {
    surface.with_handler(id, |g, _| g.take_changes()).unwrap()
}

fn statuses(changes: &[DragChange]) -> Vec<Status> {
    changes
        .iter()
        .filter_map(|c| match c {
            DragChange::Status(s) => Some(*s),
            _ => None,
        })
        .collect()
}

fn assert_near(actual: f64, expected: f64) {
    let diff = actual - expected;
    assert!(diff * diff < 1e-18, "{actual} != {expected}");
}

#[test]
fn scenario_a_recognizes_rightward_drag() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    assert!(!surface.dispatch(&TouchBatch::press(0, A, Point::new(0.0, 0.0))));
    assert!(surface.broker().is_candidate(A, r));

    surface.dispatch(&TouchBatch::moved(10, A, Point::new(15.0, 0.0)));
    let changes = take_changes(&mut surface, r);
    assert_eq!(statuses(&changes), [Status::Undecided, Status::Recognized]);
    assert!(changes.contains(&DragChange::Dragging(true)));
    assert!(get(&surface, r).dragging());
    assert_eq!(surface.broker().owner(A), Some(r));
    assert!(surface.broker().candidates(A).is_empty());
}

#[test]
fn scenario_b_short_move_then_release() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(5.0, 0.0)));
    assert_eq!(get(&surface, r).status(), Status::Undecided);
    surface.dispatch(&TouchBatch::release(20, A, Point::new(5.0, 0.0)));

    let changes = take_changes(&mut surface, r);
    assert_eq!(
        statuses(&changes),
        [Status::Undecided, Status::WaitingForTouch]
    );
    assert!(!changes.contains(&DragChange::Dragging(true)));
    assert_eq!(surface.broker().owner(A), None);
    assert!(!surface.broker().is_tracking(A));
}

#[test]
fn scenario_c_second_finger_in_composition_window() {
    let (mut surface, ids) =
        surface_with(vec![DragGesture::new(config().with_composition_time(60))]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    assert_eq!(get(&surface, r).status(), Status::Undecided);

    let second = TouchBatch::new(30)
        .with_point(TouchPoint::new(A, TouchPhase::Stationary, Point::ZERO))
        .with_point(TouchPoint::new(B, TouchPhase::Pressed, Point::new(40.0, 0.0)));
    surface.dispatch(&second);

    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(A, r));
    assert!(surface.broker().is_watching(A, r));
    assert!(surface.broker().is_watching(B, r));
}

#[test]
fn scenario_d_leftward_movement_rejects_rightward_drag() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::new(100.0, 0.0)));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(60.0, 0.0)));

    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(A, r));
    assert!(surface.broker().is_watching(A, r));

    // Coming back rightwards does not revive the gesture.
    surface.dispatch(&TouchBatch::moved(20, A, Point::new(200.0, 0.0)));
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert_eq!(surface.broker().owner(A), None);
}

#[test]
fn scenario_e_timeout_while_undecided() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(100, A, Point::new(4.0, 0.0)));
    surface.advance_to(399);
    assert_eq!(get(&surface, r).status(), Status::Undecided);

    surface.advance_to(400);
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(A, r));
    assert!(surface.broker().is_watching(A, r));
    assert_eq!(get(&surface, r).timer_deadline(), None);
}

#[test]
fn timeout_fires_before_a_late_batch() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(450, A, Point::new(30.0, 0.0)));

    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert_eq!(surface.broker().owner(A), None);
}

#[test]
fn competing_recognizers_have_a_single_owner() {
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config()),
        DragGesture::new(config().with_direction(Direction::Downwards)),
    ]);
    let (right, down) = (ids[0], ids[1]);

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    assert_eq!(surface.broker().candidates(A), [right, down]);

    surface.dispatch(&TouchBatch::moved(10, A, Point::new(0.0, 25.0)));
    assert_eq!(surface.broker().owner(A), Some(down));
    assert_eq!(get(&surface, down).status(), Status::Recognized);
    assert_eq!(get(&surface, right).status(), Status::WaitingForTouch);
    assert!(surface.broker().is_watching(A, right));

    // Only the owner keeps receiving the touch directly.
    surface.dispatch(&TouchBatch::moved(20, A, Point::new(0.0, 40.0)));
    assert_eq!(get(&surface, right).status(), Status::WaitingForTouch);
    assert!(get(&surface, down).scene_distance() > 0.0);

    surface.dispatch(&TouchBatch::release(30, A, Point::new(0.0, 40.0)));
    assert_eq!(get(&surface, down).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_tracking(A));
}

#[test]
fn watcher_learns_of_release_after_rejection() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::new(50.0, 0.0)));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(20.0, 0.0)));
    assert!(get(&surface, r).active_touches().contains(A));

    surface.dispatch(&TouchBatch::release(20, A, Point::new(20.0, 0.0)));
    assert!(!get(&surface, r).active_touches().contains(A));
    assert!(get(&surface, r).active_touches().is_empty());
}

#[test]
fn moving_past_max_distance_sideways_rejects() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(
        config().with_max_distance(40.0).with_damping(0.0),
    )]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(0.0, 30.0)));
    assert_eq!(get(&surface, r).status(), Status::Undecided);
    surface.dispatch(&TouchBatch::moved(20, A, Point::new(0.0, 50.0)));
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(surface.broker().is_watching(A, r));
}

#[test]
fn unsigned_direction_accepts_either_way() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(
        config().with_direction(Direction::Horizontal),
    )]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::new(100.0, 0.0)));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(80.0, 0.0)));
    assert_eq!(get(&surface, r).status(), Status::Recognized);
    assert!(get(&surface, r).distance() < 0.0);
}

#[test]
fn composition_window_postpones_recognition() {
    let (mut surface, ids) =
        surface_with(vec![DragGesture::new(config().with_composition_time(60))]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(30, A, Point::new(30.0, 0.0)));
    assert_eq!(get(&surface, r).status(), Status::Undecided);
    surface.dispatch(&TouchBatch::moved(70, A, Point::new(31.0, 0.0)));
    assert_eq!(get(&surface, r).status(), Status::Recognized);
}

#[test]
fn immediate_recognition_takes_the_press() {
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config().with_immediate_recognition(true)),
        DragGesture::new(config()),
    ]);
    let (eager, other) = (ids[0], ids[1]);

    assert!(surface.dispatch(&TouchBatch::press(0, A, Point::new(3.0, 4.0))));
    assert_eq!(surface.broker().owner(A), Some(eager));
    assert_eq!(get(&surface, eager).status(), Status::Recognized);
    assert_eq!(get(&surface, other).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(A, other));

    // No smoothing when recognition is disabled.
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(13.0, 4.0)));
    assert_eq!(get(&surface, eager).touch_pos(), Point::new(13.0, 4.0));
    assert_eq!(get(&surface, eager).distance(), 10.0);
}

#[test]
fn recognized_position_is_smoothed() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(15.0, 0.0)));
    assert_near(get(&surface, r).touch_pos().x, 6.0);
    surface.dispatch(&TouchBatch::moved(20, A, Point::new(25.0, 0.0)));
    assert_near(get(&surface, r).touch_pos().x, 13.6);
    assert_near(get(&surface, r).distance(), 13.6);
    assert_near(get(&surface, r).scene_distance(), 13.6);

    take_changes(&mut surface, r);
    surface.dispatch(&TouchBatch::release(30, A, Point::new(25.0, 0.0)));
    let changes = take_changes(&mut surface, r);
    assert_eq!(statuses(&changes), [Status::WaitingForTouch]);
    let dragging = changes
        .iter()
        .position(|c| *c == DragChange::Dragging(false))
        .unwrap();
    let pressed = changes
        .iter()
        .position(|c| *c == DragChange::Pressed(false))
        .unwrap();
    assert!(dragging < pressed);
}

#[test]
fn disabling_abandons_the_gesture() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.with_handler(r, |g, cx| g.set_enabled(cx, false));
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(A, r));
    assert!(surface.broker().is_watching(A, r));

    surface.dispatch(&TouchBatch::release(10, A, Point::ZERO));
    surface.dispatch(&TouchBatch::press(20, B, Point::ZERO));
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    assert!(!surface.broker().is_candidate(B, r));

    surface.with_handler(r, |g, cx| g.set_enabled(cx, true));
    surface.dispatch(&TouchBatch::release(30, B, Point::ZERO));
    surface.dispatch(&TouchBatch::press(40, A, Point::ZERO));
    assert_eq!(get(&surface, r).status(), Status::Undecided);
}

#[test]
fn hiding_a_recognized_drag_stops_dragging() {
    let (mut surface, ids) = surface_with(vec![DragGesture::new(config())]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(20.0, 0.0)));
    assert!(get(&surface, r).dragging());

    surface.with_handler(r, |g, cx| g.set_visible(cx, false));
    assert!(!get(&surface, r).dragging());
    assert!(!get(&surface, r).pressed());
}

#[test]
fn second_finger_reaches_others_while_dragging() {
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config()),
        DragGesture::new(config()),
    ]);
    let (first, second) = (ids[0], ids[1]);

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(20.0, 0.0)));
    assert_eq!(surface.broker().owner(A), Some(first));
    assert_eq!(get(&surface, second).status(), Status::WaitingForTouch);

    let press_b = TouchBatch::new(20)
        .with_point(TouchPoint::new(A, TouchPhase::Stationary, Point::new(20.0, 0.0)))
        .with_point(TouchPoint::new(B, TouchPhase::Pressed, Point::new(80.0, 0.0)));
    assert!(!surface.dispatch(&press_b));
    assert_eq!(get(&surface, first).status(), Status::Recognized);
    assert_eq!(get(&surface, second).status(), Status::Undecided);
    assert_eq!(surface.broker().candidates(B), [second]);
    assert!(surface.broker().is_watching(B, first));

    let drag_b = TouchBatch::new(30)
        .with_point(TouchPoint::new(A, TouchPhase::Stationary, Point::new(20.0, 0.0)))
        .with_point(TouchPoint::new(B, TouchPhase::Moved, Point::new(110.0, 0.0)));
    surface.dispatch(&drag_b);
    assert_eq!(get(&surface, second).status(), Status::Recognized);
    assert_eq!(surface.broker().owned_by(first), [A]);
    assert_eq!(surface.broker().owned_by(second), [B]);
}

#[test]
fn re_enabled_owner_leaves_the_next_touch_to_others() {
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config().with_immediate_recognition(true)),
        DragGesture::new(config()),
    ]);
    let (eager, other) = (ids[0], ids[1]);

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.with_handler(eager, |g, cx| g.set_enabled(cx, false));
    assert_eq!(get(&surface, eager).status(), Status::WaitingForTouch);
    assert_eq!(surface.broker().owner(A), Some(eager));
    surface.with_handler(eager, |g, cx| g.set_enabled(cx, true));

    let press_b = TouchBatch::new(10)
        .with_point(TouchPoint::new(A, TouchPhase::Stationary, Point::ZERO))
        .with_point(TouchPoint::new(B, TouchPhase::Pressed, Point::new(50.0, 0.0)));
    assert!(!surface.dispatch(&press_b));
    assert_eq!(surface.broker().owned_by(eager), [A]);
    assert_eq!(surface.broker().owner(B), None);
    assert!(surface.broker().is_watching(B, eager));
    assert_eq!(get(&surface, eager).status(), Status::WaitingForTouch);
    assert_eq!(get(&surface, other).status(), Status::Undecided);
    assert_eq!(surface.broker().candidates(B), [other]);

    // With the old touch gone the recognizer claims presses again.
    let lift_both = TouchBatch::new(20)
        .with_point(TouchPoint::new(A, TouchPhase::Released, Point::ZERO))
        .with_point(TouchPoint::new(B, TouchPhase::Released, Point::new(50.0, 0.0)));
    surface.dispatch(&lift_both);
    let c = TouchId(3);
    assert!(surface.dispatch(&TouchBatch::press(30, c, Point::ZERO)));
    assert_eq!(surface.broker().owned_by(eager), [c]);
    assert_eq!(get(&surface, eager).status(), Status::Recognized);
}

#[test]
fn cancel_resets_owner_and_candidates() {
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config()),
        DragGesture::new(config().with_direction(Direction::Upwards)),
    ]);
    let (owner, loser) = (ids[0], ids[1]);

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(20.0, 0.0)));
    assert_eq!(surface.broker().owner(A), Some(owner));

    let second = TouchBatch::new(20)
        .with_point(TouchPoint::new(A, TouchPhase::Stationary, Point::new(20.0, 0.0)))
        .with_point(TouchPoint::new(B, TouchPhase::Pressed, Point::new(80.0, 80.0)));
    surface.dispatch(&second);
    assert_eq!(get(&surface, owner).status(), Status::Recognized);
    surface.cancel(30);

    assert_eq!(get(&surface, owner).status(), Status::WaitingForTouch);
    assert_eq!(get(&surface, loser).status(), Status::WaitingForTouch);
    assert!(get(&surface, owner).active_touches().is_empty());
    assert!(get(&surface, loser).active_touches().is_empty());
    assert!(surface.broker().tracked_touches().is_empty());
}

#[test]
fn moving_scroll_companion_blocks_new_drags() {
    let companion = ScrollCompanion::new();
    let (mut surface, ids) = surface_with(vec![
        DragGesture::new(config()).with_scroll_companion(companion.clone()),
    ]);
    let r = ids[0];

    companion.set_moving(true);
    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    assert_eq!(get(&surface, r).status(), Status::WaitingForTouch);
    surface.dispatch(&TouchBatch::release(10, A, Point::ZERO));

    companion.set_moving(false);
    surface.dispatch(&TouchBatch::press(20, B, Point::ZERO));
    assert_eq!(get(&surface, r).status(), Status::Undecided);
}

#[test]
fn direction_follows_item_rotation() {
    // Rightwards in a quarter-turned item points down the scene.
    let gesture = DragGesture::new(config())
        .with_scene_transform(Affine::rotate(core::f64::consts::FRAC_PI_2));
    let (mut surface, ids) = surface_with(vec![gesture]);
    let r = ids[0];

    surface.dispatch(&TouchBatch::press(0, A, Point::ZERO));
    surface.dispatch(&TouchBatch::moved(10, A, Point::new(0.0, 20.0)));
    assert_eq!(get(&surface, r).status(), Status::Recognized);
    assert!(get(&surface, r).scene_distance() > 0.0);
    assert!(get(&surface, r).distance() > 0.0);
}
