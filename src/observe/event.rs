//! Observability events emitted by the scheduler, workers, and handlers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Global sequence counter; restores order when events interleave.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of pipeline observability events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEventKind {
    /// A worker loop started consuming. Sets `queue`.
    WorkerStarted,
    /// A handler returned a retryable error; the message was returned to
    /// its queue. Sets `queue`, `reason`.
    HandlerFailed,
    /// A handler returned a data error; the message was acknowledged and
    /// dropped. Sets `queue`, `reason`.
    MessageDropped,
    /// A scheduler tick claimed due subscriptions. Sets `count`.
    SubscriptionsClaimed,
    /// Enqueue after a successful claim failed; the subscription stays
    /// `processing` until something releases it. Sets `webhook`, `reason`.
    EnqueueFailed,
    /// A diff cycle finished and its snapshot was persisted. Sets
    /// `webhook`, `count` (events emitted).
    DiffCompleted,
    /// A bootstrap cycle seeded the initial snapshot. Sets `webhook`,
    /// `count` (items observed).
    SnapshotSeeded,
    /// A webhook POST got a 2xx. Sets `webhook`, `status`.
    DeliverySucceeded,
    /// A webhook POST got a non-2xx or never reached the endpoint; the
    /// event is gone. Sets `webhook`, `reason`, maybe `status`.
    DeliveryFailed,
    /// Shutdown signal observed.
    ShutdownRequested,
    /// All loops drained within the grace period.
    AllDrainedWithinGrace,
    /// Grace period elapsed with loops still running.
    GraceExceeded,
}

/// One observability event with builder-style optional metadata.
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    /// Monotonic global sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: DateTime<Utc>,
    /// Event classification.
    pub kind: PipelineEventKind,
    /// Subscription involved, if any.
    pub webhook: Option<Arc<str>>,
    /// Queue involved, if any.
    pub queue: Option<&'static str>,
    /// Human-readable detail (error text, drop reason).
    pub reason: Option<Arc<str>>,
    /// HTTP status, for delivery outcomes.
    pub status: Option<u16>,
    /// A count whose meaning depends on `kind`.
    pub count: Option<usize>,
}

impl PipelineEvent {
    /// New event of the given kind, stamped now with the next sequence.
    pub fn new(kind: PipelineEventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: Utc::now(),
            kind,
            webhook: None,
            queue: None,
            reason: None,
            status: None,
            count: None,
        }
    }

    #[inline]
    pub fn with_webhook(mut self, id: impl Into<Arc<str>>) -> Self {
        self.webhook = Some(id.into());
        self
    }

    #[inline]
    pub fn with_queue(mut self, queue: &'static str) -> Self {
        self.queue = Some(queue);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}
