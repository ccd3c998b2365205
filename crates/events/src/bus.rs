//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus distributes committed events to consumers. It is transport-agnostic
//! and gives at-least-once delivery: consumers must tolerate duplicates.

use std::sync::Arc;
use std::sync::mpsc::Receiver;

/// A subscription to an event stream.
///
/// Each subscription receives a copy of every message published after it was
/// created (broadcast semantics). Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ```text
/// Service → Repository (commit) → EventBus (publish) → Consumers
/// ```
///
/// `publish()` can fail; since the change is already committed, callers decide
/// whether to retry or just log.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
