// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_drag_gesture --heading-base-level=0

//! Understory Drag Gesture: recognize single-finger drags along one axis.
//!
//! [`DragGesture`](recognizer::DragGesture) is a recognizer for an
//! [`understory_touch`] surface. It watches a press, waits until the finger
//! travels far enough in the configured [`Direction`](direction::Direction),
//! and only then claims the touch, so that overlapping recognizers (a list
//! scrolling vertically, a button under the finger) keep working until the
//! drag is certain.
//!
//! ## Modules
//!
//! - [`recognizer`]: the state machine and its observable properties.
//! - [`config`]: thresholds, time limits and density-based defaults.
//! - [`direction`]: directions and their scene-space vectors.
//! - [`damped`]: jitter filtering of touch positions.
//!
//! ## Example
//!
//! ```
//! use kurbo::Point;
//! use understory_drag_gesture::config::DragConfig;
//! use understory_drag_gesture::direction::Direction;
//! use understory_drag_gesture::recognizer::{DragChange, DragGesture};
//! use understory_touch::event::{TouchBatch, TouchId};
//! use understory_touch::surface::TouchSurface;
//!
//! let config = DragConfig::default()
//!     .with_direction(Direction::Upwards)
//!     .with_distance_threshold(8.0)
//!     .with_composition_time(0);
//! let mut surface = TouchSurface::new();
//! let id = surface.add_handler(DragGesture::new(config));
//!
//! let finger = TouchId(3);
//! surface.dispatch(&TouchBatch::press(0, finger, Point::new(50.0, 100.0)));
//! surface.dispatch(&TouchBatch::moved(16, finger, Point::new(50.0, 80.0)));
//!
//! let changes = surface.with_handler(id, |drag, _| drag.take_changes()).unwrap();
//! assert!(changes.contains(&DragChange::Dragging(true)));
//! ```
//!
//! ## Features
//!
//! - `std` (default): build Kurbo with the standard library.
//! - `libm`: build Kurbo's float math through `libm` for `no_std` targets.
//!
//! This crate is `no_std` compatible (with `alloc`).

#![no_std]

extern crate alloc;

pub mod config;
pub mod damped;
pub mod direction;
pub mod recognizer;
