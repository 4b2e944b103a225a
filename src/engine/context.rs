//! Shared state between a collection worker and its host.
//!
//! The host keeps a [`CancelFlag`] and an event receiver; the worker gets
//! the [`RunContext`]. Cancellation is cooperative: setting the flag stops
//! new work from being scheduled but never kills work already in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};

use super::RunState;

/// Cooperative cancellation flag, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress notifications emitted while a run executes.
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    /// The run moved to a new state.
    State(RunState),
    /// Overall progress in percent, monotonically non-decreasing.
    Progress(u8),
    /// A package is about to be collected. `index` is zero-based.
    PackageStarted { id: String, index: usize, total: usize },
    /// A package finished collecting, successfully or not.
    PackageFinished { id: String, index: usize, total: usize },
    /// Free-form narration suitable for a status line.
    Message(String),
}

/// Everything a worker needs to talk back to its host.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub cancel: CancelFlag,
    events: Sender<CollectionEvent>,
}

impl RunContext {
    /// A context whose events never block the worker.
    pub fn new() -> (Self, Receiver<CollectionEvent>) {
        let (events, receiver) = unbounded();
        (
            Self {
                cancel: CancelFlag::new(),
                events,
            },
            receiver,
        )
    }

    /// A context whose events rendezvous with the receiver.
    ///
    /// The worker blocks on every emit until the host takes the event, which
    /// gives the host a deterministic view of where the worker is.
    pub fn rendezvous() -> (Self, Receiver<CollectionEvent>) {
        let (events, receiver) = bounded(0);
        (
            Self {
                cancel: CancelFlag::new(),
                events,
            },
            receiver,
        )
    }

    /// Sends an event; a host that has hung up is ignored.
    pub fn emit(&self, event: CollectionEvent) {
        let _ = self.events.send(event);
    }

    pub fn emit_message(&self, text: impl Into<String>) {
        self.emit(CollectionEvent::Message(text.into()));
    }
}
