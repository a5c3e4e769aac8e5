//! Frame-driven timer registry
//!
//! Timers are kept in a queue ordered by fire time, so cancelling is just
//! removing the entry. The scheduler never calls anything itself: callers pop
//! due timers one at a time and dispatch the attached action. A dispatch that
//! cancels timers therefore affects every later fire in the same drain.

use std::collections::{BTreeMap, HashMap};

/// Handle to a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A timer that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<A> {
    pub id: TimerId,
    /// Scheduled fire time (ms), not the time the caller noticed it
    pub fire_at: u64,
    pub action: A,
}

#[derive(Debug, Clone)]
struct Entry<A> {
    interval: Option<u64>,
    action: A,
}

/// Cancellable timer queue keyed by fire time
#[derive(Debug, Clone)]
pub struct Scheduler<A> {
    now: u64,
    next_id: u64,
    /// (fire_at, id) -> timer; equal fire times pop in creation order
    queue: BTreeMap<(u64, TimerId), Entry<A>>,
    /// id -> fire_at for O(log n) cancellation
    index: HashMap<TimerId, u64>,
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            queue: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Current scheduler clock (ms)
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether the timer is still waiting to fire
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Fire time of a pending timer
    pub fn fire_time(&self, id: TimerId) -> Option<u64> {
        self.index.get(&id).copied()
    }

    /// Fire once, `delay` ms from now
    pub fn schedule_once(&mut self, delay: u64, action: A) -> TimerId {
        self.insert(self.now + delay, None, action)
    }

    /// Fire once at an absolute time. Times in the past fire on the next drain.
    pub fn schedule_once_at(&mut self, fire_at: u64, action: A) -> TimerId {
        self.insert(fire_at, None, action)
    }

    /// Fire every `interval` ms, first fire one interval from now
    pub fn schedule_repeating(&mut self, interval: u64, action: A) -> TimerId {
        let interval = interval.max(1);
        self.insert(self.now + interval, Some(interval), action)
    }

    fn insert(&mut self, fire_at: u64, interval: Option<u64>, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((fire_at, id), Entry { interval, action });
        self.index.insert(id, fire_at);
        id
    }

    /// Remove a timer. Unknown, fired or already cancelled ids are a no-op.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(fire_at) => self.queue.remove(&(fire_at, id)).is_some(),
            None => false,
        }
    }

    /// Destroy every timer, returning how many were live
    pub fn cancel_all(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        self.index.clear();
        count
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, time: u64) {
        self.now = self.now.max(time);
    }
}

impl<A: Clone> Scheduler<A> {
    /// Pop the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's fire time. Repeating timers are re-armed
    /// one interval later under the same id before returning.
    pub fn pop_due(&mut self, until: u64) -> Option<Fired<A>> {
        let (&(fire_at, id), _) = self.queue.first_key_value()?;
        if fire_at > until {
            return None;
        }

        let entry = self.queue.remove(&(fire_at, id))?;
        self.index.remove(&id);
        self.now = self.now.max(fire_at);

        if let Some(interval) = entry.interval {
            let next = fire_at + interval;
            self.queue.insert(
                (next, id),
                Entry {
                    interval: entry.interval,
                    action: entry.action.clone(),
                },
            );
            self.index.insert(id, next);
        }

        Some(Fired {
            id,
            fire_at,
            action: entry.action,
        })
    }
}
