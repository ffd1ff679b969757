//! In-memory broker used by tests and the demo binary.
//!
//! Declares the three canonical queues up front, supports competing
//! consumers, and requeues rejected messages at the front so redelivery
//! is observable without broker semantics getting in the way.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use super::{
    Acker, Broker, Consume, Delivery, QueueError, EVENTS_QUEUE, INITIAL_POLL_QUEUE,
    PROCESSING_QUEUE,
};

#[derive(Default)]
struct QueueState {
    messages: Mutex<VecDeque<Vec<u8>>>,
    notify: Notify,
}

/// In-memory [`Broker`] with the three canonical queues.
pub struct MemoryBroker {
    queues: HashMap<&'static str, Arc<QueueState>>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        let mut queues = HashMap::new();
        for name in [PROCESSING_QUEUE, EVENTS_QUEUE, INITIAL_POLL_QUEUE] {
            queues.insert(name, Arc::new(QueueState::default()));
        }
        Self { queues }
    }

    fn queue(&self, name: &str) -> Result<&Arc<QueueState>, QueueError> {
        self.queues
            .get(name)
            .ok_or_else(|| QueueError::UnknownQueue(name.to_owned()))
    }

    /// Number of messages currently waiting on a queue (for tests).
    pub async fn depth(&self, name: &str) -> usize {
        match self.queue(name) {
            Ok(q) => q.messages.lock().await.len(),
            Err(_) => 0,
        }
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), QueueError> {
        let state = self.queue(queue)?;
        state.messages.lock().await.push_back(payload);
        state.notify.notify_one();
        Ok(())
    }

    async fn consumer(&self, queue: &str) -> Result<Box<dyn Consume>, QueueError> {
        Ok(Box::new(MemoryConsumer {
            state: Arc::clone(self.queue(queue)?),
        }))
    }
}

struct MemoryConsumer {
    state: Arc<QueueState>,
}

#[async_trait]
impl Consume for MemoryConsumer {
    async fn next(&mut self) -> Option<Delivery> {
        loop {
            if let Some(payload) = self.state.messages.lock().await.pop_front() {
                return Some(Delivery::new(
                    payload.clone(),
                    Box::new(MemoryAcker {
                        state: Arc::clone(&self.state),
                        payload,
                    }),
                ));
            }
            self.state.notify.notified().await;
        }
    }
}

struct MemoryAcker {
    state: Arc<QueueState>,
    payload: Vec<u8>,
}

#[async_trait]
impl Acker for MemoryAcker {
    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<(), QueueError> {
        self.state.messages.lock().await.push_front(self.payload);
        self.state.notify.notify_one();
        Ok(())
    }
}
