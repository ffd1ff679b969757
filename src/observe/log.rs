//! Default bus consumer: translates pipeline events into `tracing` records.

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::bus::Bus;
use super::event::{PipelineEvent, PipelineEventKind};

/// Spawns a task draining the bus into `tracing` until the bus closes.
///
/// Lag is tolerated: skipped events are counted and noted, publishers are
/// never slowed down.
pub fn spawn_log_drain(bus: &Bus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => log_event(&ev),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "log drain lagged behind the bus"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(ev: &PipelineEvent) {
    let webhook = ev.webhook.as_deref().unwrap_or("-");
    match ev.kind {
        PipelineEventKind::WorkerStarted => {
            info!(queue = ev.queue.unwrap_or("-"), "worker started");
        }
        PipelineEventKind::HandlerFailed => {
            warn!(
                queue = ev.queue.unwrap_or("-"),
                webhook,
                reason = ev.reason.as_deref().unwrap_or("-"),
                "handler failed; message returned for redelivery"
            );
        }
        PipelineEventKind::MessageDropped => {
            error!(
                queue = ev.queue.unwrap_or("-"),
                reason = ev.reason.as_deref().unwrap_or("-"),
                "message dropped"
            );
        }
        PipelineEventKind::SubscriptionsClaimed => {
            info!(count = ev.count.unwrap_or(0), "claimed due subscriptions");
        }
        PipelineEventKind::EnqueueFailed => {
            error!(
                webhook,
                reason = ev.reason.as_deref().unwrap_or("-"),
                "enqueue after claim failed; subscription parked in processing"
            );
        }
        PipelineEventKind::DiffCompleted => {
            info!(webhook, events = ev.count.unwrap_or(0), "diff cycle completed");
        }
        PipelineEventKind::SnapshotSeeded => {
            info!(webhook, items = ev.count.unwrap_or(0), "initial snapshot seeded");
        }
        PipelineEventKind::DeliverySucceeded => {
            info!(webhook, status = ev.status.unwrap_or(0), "event delivered");
        }
        PipelineEventKind::DeliveryFailed => {
            warn!(
                webhook,
                status = ev.status.unwrap_or(0),
                reason = ev.reason.as_deref().unwrap_or("-"),
                "delivery failed; event dropped"
            );
        }
        PipelineEventKind::ShutdownRequested => info!("shutdown requested"),
        PipelineEventKind::AllDrainedWithinGrace => info!("all worker loops drained"),
        PipelineEventKind::GraceExceeded => error!("shutdown grace exceeded"),
    }
}
