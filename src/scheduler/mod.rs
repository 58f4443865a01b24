//! One-shot deferred ticks.
//!
//! A scheduler hands out a [`TickHandle`] for every scheduled tick and later
//! delivers that handle back to whoever drives the engine. Cancelling a handle
//! guarantees it is never delivered.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// Identifies one scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

pub trait Scheduler {
    fn schedule(&mut self, after: Duration) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
}

pub type TickSender = mpsc::UnboundedSender<TickHandle>;
pub type TickReceiver = mpsc::UnboundedReceiver<TickHandle>;

/// Runs each tick as a sleeping tokio task that posts its handle on a channel.
///
/// Must be used from inside a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    tx: TickSender,
    tasks: HashMap<TickHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, TickReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_id: 0,
            tx,
            tasks: HashMap::new(),
        };
        (scheduler, rx)
    }

    /// Number of ticks still waiting to fire.
    pub fn outstanding(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, after: Duration) -> TickHandle {
        // Drop bookkeeping for ticks that already fired
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(handle);
        });
        self.tasks.insert(handle, task);
        trace!("Scheduled tick {:?} in {:?}", handle, after);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            trace!("Cancelled tick {:?}", handle);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Deterministic scheduler: ticks fire only when the caller asks.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    pending: VecDeque<(TickHandle, Duration)>,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the oldest pending tick, as if its delay had elapsed.
    pub fn fire_next(&mut self) -> Option<TickHandle> {
        self.pending.pop_front().map(|(handle, _)| handle)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn next_delay(&self) -> Option<Duration> {
        self.pending.front().map(|(_, after)| *after)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, after: Duration) -> TickHandle {
        self.next_id += 1;
        let handle = TickHandle(self.next_id);
        self.pending.push_back((handle, after));
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != handle);
        if self.pending.len() < before {
            self.cancelled += 1;
        }
    }
}
