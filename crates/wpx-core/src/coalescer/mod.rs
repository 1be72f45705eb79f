//! Mutation coalescer.
//!
//! Buffers change notifications and hands them to a flush callback either when
//! `buffer_size` notifications have arrived or after `idle_timeout` without
//! reaching it. Rewriting attributes is itself an observable mutation, so the
//! batch is detached before the callback runs: anything the callback causes is
//! collected into a fresh batch instead of the one being flushed.

mod driver;
mod timer;

pub use driver::{drive, tokio_timers, TimerEvents, TokioTimers};
pub use timer::{ManualTimers, TimerHost, TimerId};

use std::time::Duration;

/// Flush-by-count threshold used when none is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 10;
/// Flush-by-time window used when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Something that produces change records and can be told what to watch.
pub trait ChangeSource {
    type Record;
    type Target;
    type Options;

    /// Starts watching `target`. No buffering semantics of its own.
    fn observe(&mut self, target: Self::Target, options: Self::Options);

    /// Drains records produced since the last call, in arrival order.
    fn take_records(&mut self) -> Vec<Self::Record>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No pending batch, no timer.
    Idle,
    /// Batch non-empty, timer armed.
    Buffering,
}

/// Why a batch was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    BufferFull,
    IdleTimeout,
    /// Explicit [`Coalescer::flush_pending`], e.g. on teardown.
    Drain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoalescerSettings {
    /// Notifications that force an immediate flush. Values below 1 are treated as 1.
    pub buffer_size: usize,
    pub idle_timeout: Duration,
}

impl Default for CoalescerSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// The buffering state machine. `F` receives each batch together with the
/// change source, so it may write back into the watched tree.
pub struct Coalescer<S, T, F>
where
    S: ChangeSource,
{
    source: S,
    timers: T,
    on_flush: F,
    settings: CoalescerSettings,
    batch: Vec<S::Record>,
    notifications: usize,
    armed: Option<TimerId>,
    flushes: u64,
}

impl<S, T, F> Coalescer<S, T, F>
where
    S: ChangeSource,
    T: TimerHost,
    F: FnMut(Vec<S::Record>, &mut S),
{
    pub fn new(source: S, timers: T, settings: CoalescerSettings, on_flush: F) -> Self {
        let settings = CoalescerSettings {
            buffer_size: settings.buffer_size.max(1),
            ..settings
        };
        Self {
            source,
            timers,
            on_flush,
            settings,
            batch: Vec::new(),
            notifications: 0,
            armed: None,
            flushes: 0,
        }
    }

    /// Pass-through to the change source.
    pub fn observe(&mut self, target: S::Target, options: S::Options) {
        self.source.observe(target, options);
    }

    /// Accepts one notification carrying `records`.
    ///
    /// Returns `true` if this notification filled the buffer and the batch was
    /// flushed synchronously. Empty notifications are ignored.
    pub fn notify(&mut self, records: Vec<S::Record>) -> bool {
        if records.is_empty() {
            return false;
        }
        self.batch.extend(records);
        self.notifications += 1;

        if self.notifications >= self.settings.buffer_size {
            self.flush(FlushReason::BufferFull);
            return true;
        }
        if self.armed.is_none() {
            self.armed = Some(self.timers.arm(self.settings.idle_timeout));
        }
        false
    }

    /// Pulls whatever the source has queued and delivers it as one notification.
    pub fn poll_source(&mut self) -> bool {
        let records = self.source.take_records();
        self.notify(records)
    }

    /// Handles expiry of timer `id`. A timer that is no longer the armed one
    /// (its batch was already flushed by count) is ignored.
    pub fn on_timer(&mut self, id: TimerId) -> bool {
        if self.armed != Some(id) {
            tracing::trace!(timer = id.get(), "stale timer ignored");
            return false;
        }
        self.armed = None;
        self.flush(FlushReason::IdleTimeout);
        true
    }

    /// Flushes the current batch, if any, regardless of thresholds.
    pub fn flush_pending(&mut self) -> bool {
        if self.batch.is_empty() {
            return false;
        }
        self.flush(FlushReason::Drain);
        true
    }

    fn flush(&mut self, reason: FlushReason) {
        if let Some(id) = self.armed.take() {
            self.timers.cancel(id);
        }
        let batch = std::mem::take(&mut self.batch);
        let notifications = std::mem::replace(&mut self.notifications, 0);
        self.flushes += 1;

        tracing::info!(
            ?reason,
            notifications,
            records = batch.len(),
            "flushing mutation batch"
        );
        (self.on_flush)(batch, &mut self.source);
    }

    pub fn state(&self) -> State {
        if self.batch.is_empty() {
            State::Idle
        } else {
            State::Buffering
        }
    }

    /// Records waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Timer currently armed for the open batch.
    pub fn armed_timer(&self) -> Option<TimerId> {
        self.armed
    }

    /// Number of flushes delivered so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    pub fn settings(&self) -> CoalescerSettings {
        self.settings
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }
}
