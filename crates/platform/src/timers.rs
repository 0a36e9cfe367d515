//! Virtual-clock interval timers.
//!
//! Time only moves when the host says so, which keeps poll-driven behavior
//! reproducible in tests and scenario replays.

use core_types::TimerId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Browsers clamp interval delays; so do we.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug)]
struct Interval {
    period: Duration,
    next_due: Duration,
}

#[derive(Debug, Default)]
pub struct IntervalTimers {
    now: Duration,
    intervals: BTreeMap<TimerId, Interval>,
}

impl IntervalTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the host started.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// (Re)start `timer`; the first tick is one period from now.
    pub fn start(&mut self, timer: TimerId, period: Duration) {
        let period = period.max(MIN_PERIOD);
        self.intervals.insert(
            timer,
            Interval {
                period,
                next_due: self.now + period,
            },
        );
    }

    pub fn cancel(&mut self, timer: TimerId) -> bool {
        self.intervals.remove(&timer).is_some()
    }

    pub fn clear(&mut self) {
        self.intervals.clear();
    }

    /// Move the clock to the earliest tick due at or before `deadline` and
    /// return its timer. Ties go to the lower timer id.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<TimerId> {
        let (&timer, interval) = self
            .intervals
            .iter_mut()
            .filter(|(_, iv)| iv.next_due <= deadline)
            .min_by_key(|(id, iv)| (iv.next_due, **id))?;
        self.now = self.now.max(interval.next_due);
        interval.next_due += interval.period;
        Some(timer)
    }

    /// Move the clock forward to `deadline` without firing anything.
    pub fn settle(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    /// Advance by `by`, returning every tick in firing order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        let deadline = self.now + by;
        let mut fired = Vec::new();
        while let Some(timer) = self.pop_due(deadline) {
            fired.push(timer);
        }
        self.settle(deadline);
        fired
    }
}
