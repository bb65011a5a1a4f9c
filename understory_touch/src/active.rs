// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Active touch registry: which fingers are down and when they landed.
//!
//! Recognizers use this to decide whether a new press falls inside the
//! composition window of another one (two fingers landing almost together
//! are a multi-finger gesture, not a single-finger drag).
//!
//! Storage is a fixed array of slots. Records are found by linear scan, which
//! is fine because the number of simultaneous fingers is tiny, and nothing is
//! allocated on the input path.
//!
//! ```
//! use understory_touch::active::ActiveTouches;
//! use understory_touch::event::TouchId;
//!
//! let mut touches = ActiveTouches::<4>::new();
//! touches.add_touch_point(TouchId(1), 100);
//! touches.add_touch_point(TouchId(2), 130);
//! assert_eq!(touches.most_recent_start_time(), Some(130));
//!
//! touches.remove_touch_point(TouchId(2));
//! assert_eq!(touches.most_recent_start_time(), Some(100));
//! assert_eq!(touches.touch_start_time(TouchId(2)), None);
//! ```

use crate::event::{TouchBatch, TouchId, TouchPhase, TouchPhases};

/// Capacity used when none is given; comfortably above any real finger count.
pub const DEFAULT_CAPACITY: usize = 20;

/// A finger currently pressed on the surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ActiveTouch {
    /// The touch handle.
    pub id: TouchId,
    /// Monotonic time of the press, in milliseconds.
    pub start_time_ms: u64,
}

/// Fixed-capacity pool of [`ActiveTouch`] records.
#[derive(Clone, Debug)]
pub struct ActiveTouches<const N: usize = DEFAULT_CAPACITY> {
    slots: [Option<ActiveTouch>; N],
    len: usize,
}

impl<const N: usize> Default for ActiveTouches<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ActiveTouches<N> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: [None; N],
            len: 0,
        }
    }

    /// Returns the number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of active touches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no finger is down.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Records a press of `id` at `now_ms` and returns the slot it landed in.
    ///
    /// A record already held for `id` is restarted in place. Returns `None`
    /// when every slot is taken; the press is then simply not tracked.
    pub fn add_touch_point(&mut self, id: TouchId, now_ms: u64) -> Option<usize> {
        let record = ActiveTouch {
            id,
            start_time_ms: now_ms,
        };
        if let Some(slot) = self.slot_of(id) {
            self.slots[slot] = Some(record);
            return Some(slot);
        }
        let Some(slot) = self.slots.iter().position(Option::is_none) else {
            log::warn!("active touch pool exhausted ({N} slots), not tracking {id:?}");
            return None;
        };
        self.slots[slot] = Some(record);
        self.len += 1;
        Some(slot)
    }

    /// Forgets `id`. Returns `false` if it was not tracked.
    pub fn remove_touch_point(&mut self, id: TouchId) -> bool {
        match self.slot_of(id) {
            Some(slot) => self.free_slot(slot),
            None => false,
        }
    }

    /// Frees a slot previously returned by [`ActiveTouches::add_touch_point`].
    pub fn free_slot(&mut self, slot: usize) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) if entry.is_some() => {
                *entry = None;
                self.len -= 1;
                true
            }
            _ => false,
        }
    }

    /// Returns the record stored in `slot`.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<&ActiveTouch> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Returns `true` if `id` is currently tracked.
    #[must_use]
    pub fn contains(&self, id: TouchId) -> bool {
        self.slot_of(id).is_some()
    }

    /// Returns the latest press time among active touches, or `None` if there are none.
    #[must_use]
    pub fn most_recent_start_time(&self) -> Option<u64> {
        self.iter().map(|t| t.start_time_ms).max()
    }

    /// Returns the press time of `id`, or `None` if it is not tracked.
    #[must_use]
    pub fn touch_start_time(&self, id: TouchId) -> Option<u64> {
        self.iter().find(|t| t.id == id).map(|t| t.start_time_ms)
    }

    /// Iterates over the active touches in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &ActiveTouch> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.slots = [None; N];
        self.len = 0;
    }

    /// Applies the presses and releases found in `batch`.
    ///
    /// A cancel batch clears the registry, since every touch in flight ended.
    pub fn update(&mut self, batch: &TouchBatch) {
        if batch.is_cancel() {
            self.clear();
            return;
        }
        if !batch
            .phases()
            .intersects(TouchPhases::PRESSED | TouchPhases::RELEASED)
        {
            return;
        }
        for point in batch.points() {
            match point.phase {
                TouchPhase::Pressed => {
                    self.add_touch_point(point.id, batch.time_ms());
                }
                TouchPhase::Released => {
                    self.remove_touch_point(point.id);
                }
                TouchPhase::Moved | TouchPhase::Stationary => {}
            }
        }
    }

    fn slot_of(&self, id: TouchId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_some_and(|t| t.id == id))
    }
}
