//! Error types used by the pipeline runtime and queue handlers.
//!
//! Two enums cover the whole system:
//!
//! - [`RuntimeError`] — failures of the pipeline runtime itself (startup
//!   wiring, shutdown grace overrun).
//! - [`PipelineError`] — failures inside a queue handler. The worker loop
//!   turns these into an acknowledgement decision via
//!   [`PipelineError::is_retryable`]: retryable errors leave the message
//!   unacknowledged (broker redelivery applies), data errors acknowledge
//!   and drop it so a poison message can never loop forever.
//!
//! Both provide `as_label()` for stable snake_case log fields.

use std::time::Duration;
use thiserror::Error;

use crate::queue::QueueError;
use crate::source::SourceError;
use crate::store::StoreError;

/// Errors raised by the pipeline runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A worker loop could not obtain a consumer from the broker at startup.
    ///
    /// No useful work is possible without all three consumers, so this
    /// aborts `Pipeline::run` immediately.
    #[error("failed to start consumer for queue '{queue}': {source}")]
    ConsumerSetup {
        /// Queue the consumer was requested for.
        queue: &'static str,
        /// Underlying broker error.
        source: QueueError,
    },

    /// Shutdown grace period elapsed with worker loops still running.
    #[error("shutdown grace {grace:?} exceeded; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// Signal listener registration failed.
    #[error("failed to install shutdown signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::ConsumerSetup { .. } => "runtime_consumer_setup",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// Errors raised inside a queue handler.
///
/// The split between data errors and transient errors drives the
/// acknowledgement contract; see the module docs.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Payload could not be decoded. Data error: acknowledged and dropped.
    #[error("malformed payload: {detail}")]
    Malformed {
        /// Decode failure description.
        detail: String,
    },

    /// The referenced subscription does not exist. Data error: the message
    /// can never succeed, so it is acknowledged and dropped.
    #[error("unknown subscription: {0}")]
    UnknownSubscription(String),

    /// Storage operation failed. Transient: left unacknowledged.
    #[error("storage operation failed: {0}")]
    Store(#[from] StoreError),

    /// Remote collection fetch failed. Transient: left unacknowledged.
    #[error("collection fetch failed: {0}")]
    Source(#[from] SourceError),

    /// Publish to a downstream queue failed. Transient: left unacknowledged.
    #[error("queue publish failed: {0}")]
    Queue(#[from] QueueError),
}

impl PipelineError {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineError::Malformed { .. } => "payload_malformed",
            PipelineError::UnknownSubscription(_) => "subscription_unknown",
            PipelineError::Store(_) => "store_failed",
            PipelineError::Source(_) => "source_failed",
            PipelineError::Queue(_) => "queue_publish_failed",
        }
    }

    /// Whether broker redelivery can make this error go away.
    ///
    /// `true` for transient external failures (storage, fetch, publish),
    /// `false` for data errors that would fail identically on every
    /// redelivery.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Store(_) | PipelineError::Source(_) | PipelineError::Queue(_)
        )
    }

    /// Convenience constructor for decode failures.
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        PipelineError::Malformed {
            detail: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_are_not_retryable() {
        assert!(!PipelineError::malformed("bad json").is_retryable());
        assert!(!PipelineError::UnknownSubscription("wh-1".into()).is_retryable());
    }

    #[test]
    fn transient_errors_are_retryable() {
        assert!(PipelineError::Store(StoreError::Unavailable("down".into())).is_retryable());
        assert!(PipelineError::Queue(QueueError::Closed).is_retryable());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(PipelineError::malformed("x").as_label(), "payload_malformed");
        assert_eq!(
            RuntimeError::GraceExceeded {
                grace: Duration::from_secs(5)
            }
            .as_label(),
            "runtime_grace_exceeded"
        );
    }
}
