// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_touch --heading-base-level=0

//! Understory Touch: ownership arbitration for competing touch recognizers.
//!
//! On a multi-touch surface, many overlapping recognizers may be interested
//! in the same finger: a horizontal swipe area on top of a vertical list, an
//! edge drag on top of a button. This crate decides who ends up with each
//! touch. It does not recognize gestures itself; recognizers (for example
//! `understory_drag_gesture`) evaluate touches and ask for them.
//!
//! ## Pieces
//!
//! - [`event`]: touch points, batches and the [`GestureEvent`](event::GestureEvent)
//!   sum type every recognizer consumes.
//! - [`broker`]: the [`TouchBroker`](broker::TouchBroker) tracking, per touch,
//!   its candidates, its owner and its watchers. First requester wins.
//! - [`active`]: a fixed-capacity registry of pressed touches and their start
//!   times, used for composition-window checks.
//! - [`timer`]: a cooperative deadline timer for recognition timeouts.
//! - [`surface`]: the [`TouchSurface`](surface::TouchSurface) event loop that
//!   routes batches, delivers ownership notices and fires timers.
//!
//! ## Protocol
//!
//! 1) A press is offered to every handler until one accepts it. A handler
//!    that wants to evaluate the touch registers as a *candidate* and lets the
//!    press pass.
//! 2) While nobody owns the touch, its points reach the candidates as
//!    [`GestureEvent::UnownedTouch`](event::GestureEvent::UnownedTouch).
//! 3) A candidate whose criteria are met requests ownership. It receives
//!    [`GestureEvent::OwnershipGained`](event::GestureEvent::OwnershipGained);
//!    every other candidate receives
//!    [`GestureEvent::OwnershipLost`](event::GestureEvent::OwnershipLost) and
//!    resets.
//! 4) A candidate that gives up withdraws and usually becomes a *watcher* so
//!    it still learns when the touch ends.
//!
//! Everything runs on one thread. Broker calls never fail: unknown touches and
//! stray withdrawals are ignored.
//!
//! ## Features
//!
//! - `std` (default): build Kurbo with the standard library.
//! - `libm`: build Kurbo's float math through `libm` for `no_std` targets.
//!
//! This crate is `no_std` compatible (with `alloc`).

#![no_std]

extern crate alloc;

pub mod active;
pub mod broker;
pub mod event;
pub mod surface;
pub mod timer;
