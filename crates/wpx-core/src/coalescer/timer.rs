//! One-shot timer abstraction used by the coalescer, plus a virtual clock.

use std::time::Duration;

/// Identifies one armed timer. Ids are never reused by a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub(crate) u64);

impl TimerId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Schedules one-shot timers. Firing is reported back to the coalescer by
/// whoever drives the event loop, via [`super::Coalescer::on_timer`].
pub trait TimerHost {
    fn arm(&mut self, delay: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Deterministic timers on a virtual clock that only moves on [`ManualTimers::advance`].
#[derive(Debug, Default)]
pub struct ManualTimers {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, TimerId)>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Deadline of the earliest armed timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|(at, _)| *at).min()
    }

    /// Moves the clock forward and returns the timers that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now += by;
        let now = self.now;
        let mut due: Vec<(Duration, TimerId)> = Vec::new();
        self.pending.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }
}

impl TimerHost for ManualTimers {
    fn arm(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((self.now + delay, id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|(_, t)| *t != id);
    }
}
