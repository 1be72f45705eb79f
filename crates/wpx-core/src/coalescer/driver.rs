//! Async driver: runs a coalescer on a tokio runtime, with real timers.
//!
//! Timer tasks only send their id back over a channel; every state change
//! happens inside [`drive`], so the coalescer is still mutated from a single
//! logical thread even on a multi-threaded runtime.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::timer::{TimerHost, TimerId};
use super::{ChangeSource, Coalescer};

/// Receiving side of [`TokioTimers`]: ids of timers that expired.
pub type TimerEvents = mpsc::UnboundedReceiver<TimerId>;

/// [`TimerHost`] backed by `tokio::time::sleep` tasks. Must be used inside a runtime.
#[derive(Debug)]
pub struct TokioTimers {
    next_id: u64,
    fired_tx: mpsc::UnboundedSender<TimerId>,
    tasks: HashMap<TimerId, JoinHandle<()>>,
}

/// Creates a timer host and the channel its expiries arrive on.
pub fn tokio_timers() -> (TokioTimers, TimerEvents) {
    let (fired_tx, fired_rx) = mpsc::unbounded_channel();
    let timers = TokioTimers {
        next_id: 0,
        fired_tx,
        tasks: HashMap::new(),
    };
    (timers, fired_rx)
}

impl TokioTimers {
    /// Forgets the task of a timer that has fired.
    fn fired(&mut self, id: TimerId) {
        self.tasks.remove(&id);
    }

    /// Timers armed and not yet fired or cancelled.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

impl TimerHost for TokioTimers {
    fn arm(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the driver stopped; nothing left to flush.
            let _ = tx.send(id);
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

/// Feeds `notifications` into `coalescer` and fires its timers until the
/// notification channel closes.
///
/// On close, whatever is still buffered is flushed so no record is lost, and
/// the coalescer is handed back.
pub async fn drive<S, F>(
    mut coalescer: Coalescer<S, TokioTimers, F>,
    mut timer_events: TimerEvents,
    mut notifications: mpsc::Receiver<Vec<S::Record>>,
) -> Coalescer<S, TokioTimers, F>
where
    S: ChangeSource,
    F: FnMut(Vec<S::Record>, &mut S),
{
    loop {
        tokio::select! {
            biased;
            maybe = notifications.recv() => match maybe {
                Some(records) => {
                    coalescer.notify(records);
                }
                None => break,
            },
            Some(id) = timer_events.recv() => {
                coalescer.timers_mut().fired(id);
                coalescer.on_timer(id);
            }
        }
    }

    if coalescer.flush_pending() {
        tracing::debug!("flushed remaining records on shutdown");
    }
    if let Some(id) = coalescer.armed_timer() {
        coalescer.timers_mut().cancel(id);
    }
    coalescer
}
