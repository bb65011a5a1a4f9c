// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch ownership broker: who may claim a touch, and who got it.
//!
//! For every live touch the broker keeps
//!
//! - an ordered **candidate set**: recognizers evaluating the touch that have
//!   not been granted or denied ownership yet,
//! - an **owner**: at most one recognizer that consumes the touch exclusively,
//! - **watchers**: recognizers that only want to see the touch's lifecycle
//!   (most importantly its release) without claiming it.
//!
//! A recognizer owns at most one unreleased touch at a time.
//!
//! Ownership is first-requester-wins. Recognizers only request a touch after
//! their own criteria are met, so contention is settled by whichever state
//! machine decides first. Granting a touch removes every other candidate and
//! queues an [`OwnershipNotice`] for the winner and for each loser. The
//! notices are drained by the event loop right after the call that produced
//! them, so they are observed within the same dispatch.
//!
//! Every operation tolerates unknown touches and recognizers that are not
//! candidates: misuse is ignored (and logged at debug level) so one
//! misbehaving recognizer cannot take the input pipeline down.
//!
//! ## Minimal example
//!
//! ```
//! use understory_touch::broker::TouchBroker;
//! use understory_touch::event::{TouchBatch, TouchId};
//! # use kurbo::Point;
//!
//! let mut broker = TouchBroker::<u32>::new();
//! let touch = TouchId(1);
//! broker.begin_batch(&TouchBatch::press(0, touch, Point::ZERO));
//!
//! broker.add_candidate_owner_for_touch(touch, 10);
//! broker.add_candidate_owner_for_touch(touch, 20);
//! assert_eq!(broker.candidates(touch), &[10, 20]);
//!
//! // Recognizer 20 decides first and wins.
//! assert!(broker.request_touch_ownership(touch, 20));
//! assert_eq!(broker.owner(touch), Some(20));
//! assert!(broker.candidates(touch).is_empty());
//!
//! let gained = broker.pop_notice().unwrap();
//! assert_eq!((gained.recipient, gained.gained), (20, true));
//! let lost = broker.pop_notice().unwrap();
//! assert_eq!((lost.recipient, lost.gained), (10, false));
//! ```

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::Debug;

use hashbrown::HashMap;
use smallvec::{Array, SmallVec};

use crate::event::{GestureEvent, TouchBatch, TouchId, TouchPhase};

/// Ownership change addressed to one recognizer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OwnershipNotice<K> {
    /// Recognizer to notify.
    pub recipient: K,
    /// Touch whose ownership changed.
    pub touch: TouchId,
    /// `true` if the recipient now owns the touch, `false` if it lost it.
    pub gained: bool,
}

impl<K> OwnershipNotice<K> {
    /// Converts the notice into the event delivered to the recipient.
    #[must_use]
    pub fn into_event(self) -> GestureEvent {
        if self.gained {
            GestureEvent::OwnershipGained(self.touch)
        } else {
            GestureEvent::OwnershipLost(self.touch)
        }
    }
}

/// A recipient and the touches of a batch it must hear about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route<K> {
    /// Who receives the slice.
    pub recipient: K,
    /// Touches to keep from the batch, in batch order.
    pub touches: SmallVec<[TouchId; 2]>,
}

#[derive(Clone, Debug)]
struct TouchRecord<K> {
    candidates: SmallVec<[K; 2]>,
    watchers: SmallVec<[K; 4]>,
    owner: Option<K>,
    /// Released in the batch being processed; freed by `end_batch`.
    ended: bool,
}

impl<K> TouchRecord<K> {
    fn new() -> Self {
        Self {
            candidates: SmallVec::new(),
            watchers: SmallVec::new(),
            owner: None,
            ended: false,
        }
    }
}

/// Arbiter of touch ownership for one surface.
///
/// `K` identifies recognizers; it only needs to be a small copyable key.
#[derive(Clone, Debug)]
pub struct TouchBroker<K> {
    touches: HashMap<TouchId, TouchRecord<K>>,
    pending: VecDeque<OwnershipNotice<K>>,
}

impl<K: Copy + Eq + Debug> Default for TouchBroker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Copy + Eq + Debug> TouchBroker<K> {
    /// Creates a broker tracking no touches.
    #[must_use]
    pub fn new() -> Self {
        Self {
            touches: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    /// Starts processing `batch`: new presses get a record, releases are marked as ended.
    pub fn begin_batch(&mut self, batch: &TouchBatch) {
        for point in batch.points() {
            match point.phase {
                TouchPhase::Pressed => {
                    let previous = self.touches.insert(point.id, TouchRecord::new());
                    if previous.is_some_and(|r| !r.ended) {
                        log::debug!("{:?} pressed again while still tracked, resetting", point.id);
                    }
                }
                TouchPhase::Released => match self.touches.get_mut(&point.id) {
                    Some(record) => record.ended = true,
                    None => log::debug!("release of untracked {:?}", point.id),
                },
                TouchPhase::Moved | TouchPhase::Stationary => {}
            }
        }
    }

    /// Frees the records of touches released in the batch just processed.
    pub fn end_batch(&mut self) {
        self.touches.retain(|_, record| !record.ended);
    }

    /// Computes who hears about `batch` through the unowned path.
    ///
    /// Candidates of touches nobody owns receive those touches; watchers
    /// receive their touches whether owned or not. Recipients appear in the
    /// order they are first met while walking the batch.
    #[must_use]
    pub fn route_unowned(&self, batch: &TouchBatch) -> Vec<Route<K>> {
        let mut routes = Vec::new();
        for point in batch.points() {
            let Some(record) = self.touches.get(&point.id) else {
                continue;
            };
            if record.owner.is_none() {
                for &candidate in &record.candidates {
                    push_route(&mut routes, candidate, point.id);
                }
            }
            for &watcher in &record.watchers {
                push_route(&mut routes, watcher, point.id);
            }
        }
        routes
    }

    /// Computes which owners receive which touches of `batch`.
    #[must_use]
    pub fn route_owned(&self, batch: &TouchBatch) -> Vec<Route<K>> {
        let mut routes = Vec::new();
        for point in batch.points() {
            if let Some(owner) = self.owner(point.id) {
                push_route(&mut routes, owner, point.id);
            }
        }
        routes
    }

    /// Registers `recognizer` as a pending contender for `touch`.
    ///
    /// A recognizer evaluates one touch at a time, so it is withdrawn from any
    /// other candidate set first. Returns `false` if nothing changed.
    pub fn add_candidate_owner_for_touch(&mut self, touch: TouchId, recognizer: K) -> bool {
        for (&other, record) in self.touches.iter_mut() {
            if other != touch && remove_item(&mut record.candidates, recognizer) {
                log::warn!("{recognizer:?} became a candidate for {touch:?} while still evaluating {other:?}");
            }
        }
        let record = self.touches.entry(touch).or_insert_with(TouchRecord::new);
        if record.ended || record.owner == Some(recognizer) {
            log::debug!("ignoring candidacy of {recognizer:?} for {touch:?}");
            return false;
        }
        if record.candidates.contains(&recognizer) {
            return false;
        }
        record.candidates.push(recognizer);
        true
    }

    /// Withdraws the candidacy of `recognizer` for `touch`.
    ///
    /// Returns `false` (and does nothing) if it was not a candidate.
    pub fn remove_candidate_owner_for_touch(&mut self, touch: TouchId, recognizer: K) -> bool {
        self.touches
            .get_mut(&touch)
            .is_some_and(|record| remove_item(&mut record.candidates, recognizer))
    }

    /// Claims exclusive ownership of `touch` for `recognizer`.
    ///
    /// The first request wins. On success the requester is notified with a
    /// gained notice and every remaining candidate with a lost notice. A
    /// request for a touch already owned by someone else is denied and the
    /// requester is told it lost. Unknown or already released touches are
    /// ignored. A recognizer owns at most one live touch, so a request made
    /// while it still owns another unreleased touch is denied the same way.
    /// Returns `true` if `recognizer` owns the touch afterwards.
    pub fn request_touch_ownership(&mut self, touch: TouchId, recognizer: K) -> bool {
        let holding = self.owned_live_touch(recognizer).filter(|&held| held != touch);
        let Some(record) = self.touches.get_mut(&touch) else {
            log::debug!("{recognizer:?} requested unknown {touch:?}");
            return false;
        };
        if record.ended {
            log::debug!("{recognizer:?} requested {touch:?} after its release");
            return false;
        }
        match record.owner {
            Some(owner) if owner == recognizer => true,
            Some(owner) => {
                log::debug!("{recognizer:?} denied {touch:?}, already owned by {owner:?}");
                remove_item(&mut record.candidates, recognizer);
                self.pending.push_back(OwnershipNotice {
                    recipient: recognizer,
                    touch,
                    gained: false,
                });
                false
            }
            None if holding.is_some() => {
                log::warn!("{recognizer:?} denied {touch:?} while still owning {holding:?}");
                remove_item(&mut record.candidates, recognizer);
                self.pending.push_back(OwnershipNotice {
                    recipient: recognizer,
                    touch,
                    gained: false,
                });
                false
            }
            None => {
                log::debug!("granting {touch:?} to {recognizer:?}");
                record.owner = Some(recognizer);
                remove_item(&mut record.candidates, recognizer);
                self.pending.push_back(OwnershipNotice {
                    recipient: recognizer,
                    touch,
                    gained: true,
                });
                for loser in record.candidates.drain(..) {
                    self.pending.push_back(OwnershipNotice {
                        recipient: loser,
                        touch,
                        gained: false,
                    });
                }
                true
            }
        }
    }

    /// Subscribes `recognizer` to the lifecycle of `touch` without claiming it.
    ///
    /// Returns `false` for unknown touches or if already watching.
    pub fn add_touch_watcher(&mut self, touch: TouchId, recognizer: K) -> bool {
        let Some(record) = self.touches.get_mut(&touch) else {
            return false;
        };
        if record.watchers.contains(&recognizer) {
            return false;
        }
        record.watchers.push(recognizer);
        true
    }

    /// Returns the owner of `touch`, if any.
    #[must_use]
    pub fn owner(&self, touch: TouchId) -> Option<K> {
        self.touches.get(&touch).and_then(|record| record.owner)
    }

    /// Returns the candidates of `touch`, in registration order.
    #[must_use]
    pub fn candidates(&self, touch: TouchId) -> &[K] {
        self.touches
            .get(&touch)
            .map_or(&[], |record| record.candidates.as_slice())
    }

    /// Returns the watchers of `touch`, in registration order.
    #[must_use]
    pub fn watchers(&self, touch: TouchId) -> &[K] {
        self.touches
            .get(&touch)
            .map_or(&[], |record| record.watchers.as_slice())
    }

    /// Returns `true` if `recognizer` is a candidate for `touch`.
    #[must_use]
    pub fn is_candidate(&self, touch: TouchId, recognizer: K) -> bool {
        self.candidates(touch).contains(&recognizer)
    }

    /// Returns `true` if `recognizer` watches `touch`.
    #[must_use]
    pub fn is_watching(&self, touch: TouchId, recognizer: K) -> bool {
        self.watchers(touch).contains(&recognizer)
    }

    /// Returns `true` if the broker has a record for `touch`.
    #[must_use]
    pub fn is_tracking(&self, touch: TouchId) -> bool {
        self.touches.contains_key(&touch)
    }

    /// Returns the tracked touches in ascending order.
    #[must_use]
    pub fn tracked_touches(&self) -> Vec<TouchId> {
        let mut ids: Vec<TouchId> = self.touches.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the touches owned by `recognizer`.
    #[must_use]
    pub fn owned_by(&self, recognizer: K) -> Vec<TouchId> {
        let mut ids: Vec<TouchId> = self
            .touches
            .iter()
            .filter(|(_, record)| record.owner == Some(recognizer))
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the unreleased touch owned by `recognizer`, if any.
    #[must_use]
    pub fn owned_live_touch(&self, recognizer: K) -> Option<TouchId> {
        self.touches
            .iter()
            .find(|(_, record)| record.owner == Some(recognizer) && !record.ended)
            .map(|(&id, _)| id)
    }

    /// Takes the oldest undelivered ownership notice.
    pub fn pop_notice(&mut self) -> Option<OwnershipNotice<K>> {
        self.pending.pop_front()
    }

    /// Returns `true` if notices are waiting to be delivered.
    #[must_use]
    pub fn has_pending_notices(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Forgets every touch and pending notice.
    pub fn clear(&mut self) {
        self.touches.clear();
        self.pending.clear();
    }
}

fn remove_item<A>(items: &mut SmallVec<A>, item: A::Item) -> bool
where
    A: Array,
    A::Item: PartialEq,
{
    match items.iter().position(|k| *k == item) {
        Some(index) => {
            items.remove(index);
            true
        }
        None => false,
    }
}

fn push_route<K: PartialEq>(routes: &mut Vec<Route<K>>, recipient: K, touch: TouchId) {
    match routes.iter_mut().find(|r| r.recipient == recipient) {
        Some(route) => {
            if !route.touches.contains(&touch) {
                route.touches.push(touch);
            }
        }
        None => {
            let mut touches = SmallVec::new();
            touches.push(touch);
            routes.push(Route { recipient, touches });
        }
    }
}
