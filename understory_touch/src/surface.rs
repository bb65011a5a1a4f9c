// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch surface: the single-threaded loop that feeds recognizers.
//!
//! A [`TouchSurface`] owns a [`TouchBroker`] and the recognizers registered on
//! it (anything implementing [`TouchHandler`]). For each incoming batch it:
//!
//! 1. fires recognition timers that are due at the batch's timestamp,
//! 2. lets the broker open records for new presses and mark releases,
//! 3. computes the routes for the batch (before any handler runs),
//! 4. delivers [`GestureEvent::UnownedTouch`] slices to candidates and watchers,
//! 5. delivers [`GestureEvent::Touch`] slices to owners, and offers new presses
//!    to every handler in registration order until one accepts them,
//! 6. frees the records of released touches.
//!
//! Ownership notices queued by the broker are delivered right after the
//! handler call that caused them, before the next delivery of the batch.
//! Handlers reach the broker only through a [`TouchContext`] bound to their
//! own [`HandlerId`].
//!
//! ## Minimal example
//!
//! ```
//! use kurbo::Point;
//! use understory_touch::event::{GestureEvent, TouchBatch, TouchId};
//! use understory_touch::surface::{TouchContext, TouchHandler, TouchOutcome, TouchSurface};
//!
//! // Claims every touch it is offered.
//! #[derive(Default)]
//! struct Grabber {
//!     owned: Vec<TouchId>,
//! }
//!
//! impl TouchHandler for Grabber {
//!     fn handle_event(&mut self, cx: &mut TouchContext<'_>, event: GestureEvent) -> TouchOutcome {
//!         match event {
//!             GestureEvent::Touch(batch) => {
//!                 for p in batch.pressed() {
//!                     cx.request_ownership(p.id);
//!                 }
//!                 TouchOutcome::Accepted
//!             }
//!             GestureEvent::OwnershipGained(id) => {
//!                 self.owned.push(id);
//!                 TouchOutcome::Accepted
//!             }
//!             _ => TouchOutcome::Ignored,
//!         }
//!     }
//! }
//!
//! let mut surface = TouchSurface::new();
//! let first = surface.add_handler(Grabber::default());
//! let second = surface.add_handler(Grabber::default());
//!
//! surface.dispatch(&TouchBatch::press(0, TouchId(1), Point::ZERO));
//! assert_eq!(surface.broker().owner(TouchId(1)), Some(first));
//! assert_eq!(surface.handler(first).unwrap().owned, vec![TouchId(1)]);
//! // The first handler accepted the press, so the second never saw it.
//! assert!(surface.handler(second).unwrap().owned.is_empty());
//! ```

use alloc::vec::Vec;

use kurbo::Affine;
use smallvec::SmallVec;

use crate::broker::TouchBroker;
use crate::event::{GestureEvent, TouchBatch, TouchId, TouchPhase};

/// Key of a handler registered on a [`TouchSurface`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub usize);

/// What a handler did with an event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TouchOutcome {
    /// Let the event pass; new presses are offered to the next handler.
    #[default]
    Ignored,
    /// Consume the event. New presses go no further once the handler owns one of them.
    Accepted,
}

/// A handler's view of the broker while it processes one event.
#[derive(Debug)]
pub struct TouchContext<'a> {
    broker: &'a mut TouchBroker<HandlerId>,
    handler: HandlerId,
    now_ms: u64,
}

impl<'a> TouchContext<'a> {
    /// Binds `broker` to `handler` at time `now_ms`.
    pub fn new(broker: &'a mut TouchBroker<HandlerId>, handler: HandlerId, now_ms: u64) -> Self {
        Self {
            broker,
            handler,
            now_ms,
        }
    }

    /// Returns the handler this context acts for.
    #[must_use]
    pub fn handler(&self) -> HandlerId {
        self.handler
    }

    /// Returns the current time of the event loop in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Read access to the broker.
    #[must_use]
    pub fn broker(&self) -> &TouchBroker<HandlerId> {
        self.broker
    }

    /// See [`TouchBroker::add_candidate_owner_for_touch`].
    pub fn add_candidate_owner(&mut self, touch: TouchId) -> bool {
        self.broker
            .add_candidate_owner_for_touch(touch, self.handler)
    }

    /// See [`TouchBroker::remove_candidate_owner_for_touch`].
    pub fn remove_candidate_owner(&mut self, touch: TouchId) -> bool {
        self.broker
            .remove_candidate_owner_for_touch(touch, self.handler)
    }

    /// See [`TouchBroker::request_touch_ownership`].
    pub fn request_ownership(&mut self, touch: TouchId) -> bool {
        self.broker.request_touch_ownership(touch, self.handler)
    }

    /// See [`TouchBroker::add_touch_watcher`].
    pub fn add_watcher(&mut self, touch: TouchId) -> bool {
        self.broker.add_touch_watcher(touch, self.handler)
    }
}

/// A recognizer that can live on a [`TouchSurface`].
pub trait TouchHandler {
    /// Processes one event. Broker calls made through `cx` take effect immediately.
    fn handle_event(&mut self, cx: &mut TouchContext<'_>, event: GestureEvent) -> TouchOutcome;

    /// Local→scene transform of the handler, used to localize touch points.
    fn scene_transform(&self) -> Affine {
        Affine::IDENTITY
    }

    /// Time at which the handler wants a [`GestureEvent::RecognitionTimeout`].
    fn timer_deadline(&self) -> Option<u64> {
        None
    }
}

/// Event loop owning a broker and the handlers competing for its touches.
#[derive(Debug)]
pub struct TouchSurface<H> {
    broker: TouchBroker<HandlerId>,
    handlers: Vec<H>,
    now_ms: u64,
}

impl<H: TouchHandler> Default for TouchSurface<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TouchHandler> TouchSurface<H> {
    /// Creates an empty surface at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            broker: TouchBroker::new(),
            handlers: Vec::new(),
            now_ms: 0,
        }
    }

    /// Registers a handler. Handlers registered earlier are offered new presses first.
    pub fn add_handler(&mut self, handler: H) -> HandlerId {
        self.handlers.push(handler);
        HandlerId(self.handlers.len() - 1)
    }

    /// Returns the handler registered as `id`.
    #[must_use]
    pub fn handler(&self, id: HandlerId) -> Option<&H> {
        self.handlers.get(id.0)
    }

    /// Returns every handler, indexed by [`HandlerId`].
    #[must_use]
    pub fn handlers(&self) -> &[H] {
        &self.handlers
    }

    /// Read access to the broker.
    #[must_use]
    pub fn broker(&self) -> &TouchBroker<HandlerId> {
        &self.broker
    }

    /// Returns the latest time the surface has seen.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Runs `f` on a handler with broker access, then delivers any resulting notices.
    ///
    /// This is how configuration that affects arbitration (enabling, hiding)
    /// reaches a handler outside of touch delivery.
    pub fn with_handler<R>(
        &mut self,
        id: HandlerId,
        f: impl FnOnce(&mut H, &mut TouchContext<'_>) -> R,
    ) -> Option<R> {
        let handler = self.handlers.get_mut(id.0)?;
        let mut cx = TouchContext::new(&mut self.broker, id, self.now_ms);
        let result = f(handler, &mut cx);
        self.drain_notices();
        Some(result)
    }

    /// Processes one batch. Returns `true` if a handler accepted and claimed its presses.
    ///
    /// Batches must arrive in timestamp order.
    pub fn dispatch(&mut self, batch: &TouchBatch) -> bool {
        self.advance_to(batch.time_ms());
        self.broker.begin_batch(batch);

        let unowned = self.broker.route_unowned(batch);
        let owned = self.broker.route_owned(batch);
        let has_presses = batch.pressed().next().is_some();

        for route in unowned {
            let slice = self.localize(route.recipient, batch.subset(&route.touches));
            self.deliver(route.recipient, GestureEvent::UnownedTouch(slice));
        }

        let mut presses_taken = false;
        for index in 0..self.handlers.len() {
            let id = HandlerId(index);
            let owned_here: &[TouchId] = owned
                .iter()
                .find(|route| route.recipient == id)
                .map_or(&[], |route| route.touches.as_slice());
            let offer_presses = has_presses && !presses_taken;
            if owned_here.is_empty() && !offer_presses {
                continue;
            }
            let slice = batch.filtered(|p| {
                owned_here.contains(&p.id) || (offer_presses && p.phase == TouchPhase::Pressed)
            });
            let slice = self.localize(id, slice);
            let outcome = self.deliver(id, GestureEvent::Touch(slice));
            if offer_presses && outcome == TouchOutcome::Accepted {
                presses_taken = batch.pressed().any(|p| self.broker.owner(p.id) == Some(id));
                if !presses_taken {
                    log::debug!("{id:?} accepted a batch without claiming any of its presses");
                }
            }
        }

        self.broker.end_batch();
        presses_taken
    }

    /// Moves the clock to `now_ms` and fires every timer due by then, earliest first.
    pub fn advance_to(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;
        let mut due: SmallVec<[(u64, HandlerId); 4]> = self
            .handlers
            .iter()
            .enumerate()
            .filter_map(|(index, h)| {
                h.timer_deadline()
                    .filter(|&deadline| deadline <= now)
                    .map(|deadline| (deadline, HandlerId(index)))
            })
            .collect();
        due.sort_unstable();
        for (_, id) in due {
            // An earlier timeout may already have reset this handler.
            let still_due = self.handlers[id.0]
                .timer_deadline()
                .is_some_and(|deadline| deadline <= now);
            if still_due {
                self.deliver(id, GestureEvent::RecognitionTimeout);
            }
        }
    }

    /// Aborts every touch in flight, as when the platform cancels the sequence.
    ///
    /// Owners get a cancel batch through [`GestureEvent::Touch`], candidates
    /// and watchers through [`GestureEvent::UnownedTouch`], and every other
    /// handler through [`GestureEvent::Touch`] so it can drop its bookkeeping.
    /// The broker forgets all touches afterwards.
    pub fn cancel(&mut self, now_ms: u64) {
        self.advance_to(now_ms);
        let now = self.now_ms;
        let tracked = self.broker.tracked_touches();
        for index in 0..self.handlers.len() {
            let id = HandlerId(index);
            let owns = tracked.iter().any(|&t| self.broker.owner(t) == Some(id));
            let interested = tracked
                .iter()
                .any(|&t| self.broker.is_candidate(t, id) || self.broker.is_watching(t, id));
            if owns || !interested {
                self.deliver(id, GestureEvent::Touch(TouchBatch::cancel(now)));
            }
            if interested {
                self.deliver(id, GestureEvent::UnownedTouch(TouchBatch::cancel(now)));
            }
        }
        self.broker.clear();
    }

    fn localize(&self, id: HandlerId, batch: TouchBatch) -> TouchBatch {
        match self.handlers.get(id.0) {
            Some(handler) => batch.localized(handler.scene_transform()),
            None => batch,
        }
    }

    fn deliver(&mut self, id: HandlerId, event: GestureEvent) -> TouchOutcome {
        let Some(handler) = self.handlers.get_mut(id.0) else {
            log::debug!("dropping event for unknown {id:?}");
            return TouchOutcome::Ignored;
        };
        let mut cx = TouchContext::new(&mut self.broker, id, self.now_ms);
        let outcome = handler.handle_event(&mut cx, event);
        self.drain_notices();
        outcome
    }

    fn drain_notices(&mut self) {
        while let Some(notice) = self.broker.pop_notice() {
            let id = notice.recipient;
            let Some(handler) = self.handlers.get_mut(id.0) else {
                continue;
            };
            let mut cx = TouchContext::new(&mut self.broker, id, self.now_ms);
            handler.handle_event(&mut cx, notice.into_event());
        }
    }
}
