//! Broadcast bus for pipeline events.

use tokio::sync::broadcast;

use super::event::PipelineEvent;

/// Thin wrapper over [`tokio::sync::broadcast`].
///
/// - `publish()` never blocks; with no receivers the event is dropped.
/// - Each `subscribe()` gets an independent receiver seeing only events
///   sent after it subscribed.
/// - Slow receivers observe `RecvError::Lagged` and skip old events; the
///   ring buffer holds the most recent `capacity` events.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<PipelineEvent>,
}

impl Bus {
    /// New bus with the given ring-buffer capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes one event to all current receivers.
    pub fn publish(&self, ev: PipelineEvent) {
        let _ = self.tx.send(ev);
    }

    /// New independent receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }
}
