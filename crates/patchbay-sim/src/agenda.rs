//! Time-ordered work queue driving discrete-event simulation.
//!
//! An [`Agenda`] holds pending work items, each tagged with the simulated
//! time at which it should run. Items are scheduled relative to the current
//! time and popped in time order; items scheduled for the same time run in
//! the order they were scheduled (FIFO). Popping an item advances the clock
//! to that item's time, so delays scheduled from inside a running item are
//! measured from the item's own execution time.

use std::collections::VecDeque;

/// Simulated time, in abstract delay units.
pub type Time = u64;

/// A queue of `(time, item)` pairs kept sorted by time, FIFO within a time.
#[derive(Debug, Clone)]
pub struct Agenda<T> {
    now: Time,
    queue: VecDeque<(Time, T)>,
}

impl<T> Agenda<T> {
    pub fn new() -> Self {
        Agenda {
            now: 0,
            queue: VecDeque::new(),
        }
    }

    /// The execution time of the most recently popped item, or 0 if nothing
    /// has run yet.
    pub fn now(&self) -> Time {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Enqueue `item` to run `delay` units after the current time.
    ///
    /// The item is placed after every item already scheduled at or before
    /// that time, so equal-time items run in scheduling order.
    pub fn schedule(&mut self, delay: Time, item: T) {
        let at = self.now + delay;
        let idx = self.queue.partition_point(|(t, _)| *t <= at);
        self.queue.insert(idx, (at, item));
    }

    /// Pop the earliest item and advance the clock to its time.
    pub fn next(&mut self) -> Option<T> {
        let (at, item) = self.queue.pop_front()?;
        self.now = at;
        Some(item)
    }
}

impl<T> Default for Agenda<T> {
    fn default() -> Self {
        Agenda::new()
    }
}
