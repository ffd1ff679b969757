//! Initial-poll-queue handler: seed a fresh subscription's snapshot.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use crate::diff;
use crate::error::PipelineError;
use crate::model::{InitialPollRequest, TargetKind};
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};
use crate::queue::{Handler, INITIAL_POLL_QUEUE};
use crate::source::CollectionSource;
use crate::store::{SnapshotStore, SubscriptionStore};

/// Takes the first snapshot for a newly registered subscription, so the
/// scheduler's first real cycle diffs against known state instead of
/// treating the whole collection as freshly added.
///
/// Emits no events by definition; the seeded snapshot *is* the result.
pub struct InitialPollHandler {
    subs: Arc<dyn SubscriptionStore>,
    snapshots: Arc<dyn SnapshotStore>,
    source: Arc<dyn CollectionSource>,
    bus: Bus,
}

impl InitialPollHandler {
    pub fn new(
        subs: Arc<dyn SubscriptionStore>,
        snapshots: Arc<dyn SnapshotStore>,
        source: Arc<dyn CollectionSource>,
        bus: Bus,
    ) -> Self {
        Self {
            subs,
            snapshots,
            source,
            bus,
        }
    }

    async fn seed(&self, req: &InitialPollRequest) -> Result<(), PipelineError> {
        if req.object_type == TargetKind::Item {
            warn!(webhook = %req.webhook_id, "item-level subscriptions are not supported; skipping seed");
            return Ok(());
        }

        let current = self.source.fetch(&req.object_id).await?;
        let snapshot = diff::bootstrap(&current);

        self.snapshots
            .put_item_ids(&req.webhook_id, &req.user_id, &snapshot.item_ids)
            .await?;
        self.snapshots
            .put_collection(&req.webhook_id, &req.user_id, &snapshot.collection)
            .await?;

        // The seed counts as a poll: stamping here keeps the scheduler from
        // immediately re-running what was just snapshotted.
        self.subs
            .release(&req.webhook_id, Some(Utc::now()))
            .await?;

        self.bus.publish(
            PipelineEvent::new(PipelineEventKind::SnapshotSeeded)
                .with_webhook(req.webhook_id.clone())
                .with_count(snapshot.item_ids.len()),
        );
        Ok(())
    }
}

#[async_trait]
impl Handler for InitialPollHandler {
    fn queue(&self) -> &'static str {
        INITIAL_POLL_QUEUE
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let req: InitialPollRequest =
            serde_json::from_slice(payload).map_err(PipelineError::malformed)?;

        match self.seed(&req).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(rel) = self.subs.release(&req.webhook_id, None).await {
                    warn!(webhook = %req.webhook_id, error = %rel, "failed to release claim after error");
                }
                Err(e)
            }
        }
    }
}
