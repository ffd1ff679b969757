//! Queue transport seam and the worker harness draining it.
//!
//! The broker is an external collaborator; this module pins down only
//! what the pipeline relies on:
//!
//! - three named durable queues (see the canonical name constants),
//! - manual acknowledgement: a message leaves the queue only when its
//!   handler finished without a fatal error,
//! - redelivery of unacknowledged messages (at-least-once).
//!
//! One canonical constant exists per queue and both producers and
//! consumers use it; queue names never appear as string literals anywhere
//! else.
//!
//! ```text
//! scheduler ──► "processing" ──► diff handler ──► "events" ──► delivery handler
//! (external) ─► "initial-poll" ──► bootstrap handler
//! ```

mod memory;
mod worker;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryBroker;
pub use worker::{run_worker, Handler};

/// Subscription ids due for a diff cycle (plain-text payload).
pub const PROCESSING_QUEUE: &str = "processing";
/// Detected change events awaiting delivery (JSON payload).
pub const EVENTS_QUEUE: &str = "events";
/// Bootstrap requests for new subscriptions (JSON payload).
pub const INITIAL_POLL_QUEUE: &str = "initial-poll";

/// Broker transport failure.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// The named queue was never declared.
    #[error("unknown queue '{0}'")]
    UnknownQueue(String),
    /// The broker connection or channel is gone.
    #[error("queue transport closed")]
    Closed,
}

/// Publish/consume handle to the broker.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Publishes one message to a declared queue.
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError>;

    /// Opens a competing consumer on a declared queue.
    async fn consumer(&self, queue: &str) -> Result<Box<dyn Consume>, QueueError>;
}

/// A consumer stream of deliveries from one queue.
#[async_trait]
pub trait Consume: Send {
    /// Waits for the next delivery; `None` when the transport is gone.
    async fn next(&mut self) -> Option<Delivery>;
}

/// Per-message acknowledgement handle.
#[async_trait]
pub trait Acker: Send {
    /// Removes the message from the queue.
    async fn ack(self: Box<Self>) -> Result<(), QueueError>;
    /// Returns the message to the queue for redelivery.
    async fn nack(self: Box<Self>) -> Result<(), QueueError>;
}

/// One consumed message plus its acknowledgement handle.
pub struct Delivery {
    payload: Vec<u8>,
    acker: Box<dyn Acker>,
}

impl Delivery {
    /// Assembles a delivery; broker implementations call this.
    pub fn new(payload: Vec<u8>, acker: Box<dyn Acker>) -> Self {
        Self { payload, acker }
    }

    /// Message bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledges the message (done, drop it).
    pub async fn ack(self) -> Result<(), QueueError> {
        self.acker.ack().await
    }

    /// Rejects the message back onto the queue for redelivery.
    pub async fn nack(self) -> Result<(), QueueError> {
        self.acker.nack().await
    }
}
