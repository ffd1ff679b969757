//! Processing-queue handler: fetch, diff, persist, fan out.

use std::str;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::diff;
use crate::error::PipelineError;
use crate::model::{Snapshot, TargetKind};
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};
use crate::queue::{Broker, Handler, EVENTS_QUEUE, PROCESSING_QUEUE};
use crate::source::CollectionSource;
use crate::store::{SnapshotStore, SubscriptionStore};

use async_trait::async_trait;

/// Runs one poll cycle per message. The payload is a claimed webhook id.
///
/// The claim the scheduler took is released on every exit path: the
/// `last_polled` stamp is refreshed only when the cycle completed, so a
/// failed cycle becomes due again on the next tick instead of waiting out
/// a full interval.
pub struct ProcessingHandler {
    subs: Arc<dyn SubscriptionStore>,
    snapshots: Arc<dyn SnapshotStore>,
    source: Arc<dyn CollectionSource>,
    broker: Arc<dyn Broker>,
    bus: Bus,
}

impl ProcessingHandler {
    pub fn new(
        subs: Arc<dyn SubscriptionStore>,
        snapshots: Arc<dyn SnapshotStore>,
        source: Arc<dyn CollectionSource>,
        broker: Arc<dyn Broker>,
        bus: Bus,
    ) -> Self {
        Self {
            subs,
            snapshots,
            source,
            broker,
            bus,
        }
    }

    async fn cycle(&self, webhook_id: &str) -> Result<(), PipelineError> {
        let sub = self
            .subs
            .get(webhook_id)
            .await?
            .ok_or_else(|| PipelineError::UnknownSubscription(webhook_id.to_string()))?;

        if sub.object_kind == TargetKind::Item {
            // Single-item watching is not implemented; release and move on
            // rather than poison the queue.
            warn!(webhook = %sub.id, "item-level subscriptions are not supported; skipping");
            self.subs.release(webhook_id, Some(Utc::now())).await?;
            return Ok(());
        }

        let current = self.source.fetch(&sub.object_id).await?;
        let now = Utc::now();

        let previous = match (
            self.snapshots.item_ids(webhook_id).await?,
            self.snapshots.collection(webhook_id).await?,
        ) {
            (Some(item_ids), Some(collection)) => Some(Snapshot {
                item_ids,
                collection,
            }),
            // Either half missing means there is nothing sound to diff
            // against; degrade to a bootstrap cycle.
            _ => None,
        };

        let (events, snapshot) = match previous {
            Some(previous) => {
                let outcome = diff::diff(&sub, &previous, &current, now);
                (outcome.events, outcome.snapshot)
            }
            None => (Vec::new(), diff::bootstrap(&current)),
        };

        // Snapshot halves are persisted before any event goes out: a
        // redelivered cycle then diffs clean instead of double-publishing.
        self.snapshots
            .put_item_ids(webhook_id, &sub.user_id, &snapshot.item_ids)
            .await?;
        self.snapshots
            .put_collection(webhook_id, &sub.user_id, &snapshot.collection)
            .await?;

        let detected = events.len();
        for event in events {
            let payload =
                serde_json::to_vec(&event).map_err(PipelineError::malformed)?;
            self.broker.publish(EVENTS_QUEUE, payload).await?;
        }

        self.subs.release(webhook_id, Some(now)).await?;

        self.bus.publish(
            PipelineEvent::new(PipelineEventKind::DiffCompleted)
                .with_webhook(webhook_id.to_string())
                .with_count(detected),
        );
        Ok(())
    }
}

#[async_trait]
impl Handler for ProcessingHandler {
    fn queue(&self) -> &'static str {
        PROCESSING_QUEUE
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let webhook_id = str::from_utf8(payload)
            .map_err(PipelineError::malformed)?
            .to_string();

        match self.cycle(&webhook_id).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // The claim must not survive a failed cycle. No polled
                // stamp: the subscription stays immediately due.
                if let Err(rel) = self.subs.release(&webhook_id, None).await {
                    warn!(webhook = %webhook_id, error = %rel, "failed to release claim after error");
                }
                Err(e)
            }
        }
    }
}
