//! Worker loop: drains one queue into a handler until cancelled.
//!
//! The single place where a handler result becomes an acknowledgement
//! decision:
//!
//! ```text
//! Ok(())                       → ack
//! Err(e) if e.is_retryable()   → nack  (broker redelivery, warn)
//! Err(e) otherwise             → ack   (data error: drop + error log)
//! ```
//!
//! Cancellation is checked at the safe point only — while waiting for the
//! next delivery. A handler that is mid-flight when shutdown starts runs
//! to completion (or until the grace period force-terminates the loop).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::PipelineError;
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};

use super::Consume;

/// A queue message handler.
///
/// Handlers must be idempotent with respect to redelivery: re-running one
/// against unchanged state must not produce new side effects. Every
/// durable write a handler needs must complete before it returns `Ok` —
/// the ack that follows is the broker's signal that the work is done.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Queue this handler consumes (one of the canonical constants).
    fn queue(&self) -> &'static str;

    /// Processes one message payload.
    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError>;
}

/// Pause before pulling again after a nack, so a persistently failing
/// message does not spin the loop against the broker.
const REDELIVERY_PAUSE: Duration = Duration::from_millis(250);

/// Runs one consumer loop until the token is cancelled or the transport
/// closes.
pub async fn run_worker(
    mut consumer: Box<dyn Consume>,
    handler: Arc<dyn Handler>,
    bus: Bus,
    token: CancellationToken,
) {
    let queue = handler.queue();
    bus.publish(PipelineEvent::new(PipelineEventKind::WorkerStarted).with_queue(queue));

    loop {
        let delivery = select! {
            d = consumer.next() => match d {
                Some(d) => d,
                None => break,
            },
            _ = token.cancelled() => break,
        };

        match handler.handle(delivery.payload()).await {
            Ok(()) => {
                if let Err(e) = delivery.ack().await {
                    warn!(queue, error = %e, "failed to acknowledge message");
                }
            }
            Err(e) if e.is_retryable() => {
                bus.publish(
                    PipelineEvent::new(PipelineEventKind::HandlerFailed)
                        .with_queue(queue)
                        .with_reason(e.to_string()),
                );
                if let Err(nack_err) = delivery.nack().await {
                    warn!(queue, error = %nack_err, "failed to return message to queue");
                }
                select! {
                    _ = time::sleep(REDELIVERY_PAUSE) => {}
                    _ = token.cancelled() => break,
                }
            }
            Err(e) => {
                bus.publish(
                    PipelineEvent::new(PipelineEventKind::MessageDropped)
                        .with_queue(queue)
                        .with_reason(format!("{}: {e}", e.as_label())),
                );
                if let Err(ack_err) = delivery.ack().await {
                    warn!(queue, error = %ack_err, "failed to acknowledge dropped message");
                }
            }
        }
    }
}
