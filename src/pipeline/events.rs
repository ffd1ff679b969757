//! Events-queue handler: wrap and deliver one webhook.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::dispatch::{Dispatch, DeliveryOutcome};
use crate::error::PipelineError;
use crate::model::{ChangeEvent, DeliveredEvent};
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};
use crate::queue::{Handler, EVENTS_QUEUE};
use crate::store::SubscriptionStore;

/// Delivers one detected change to the subscriber endpoint.
///
/// Delivery is best effort: whatever the receiver answers, the message is
/// consumed. Only failures *before* the attempt (storage lookup) are
/// retryable.
pub struct EventsHandler {
    subs: Arc<dyn SubscriptionStore>,
    dispatcher: Arc<dyn Dispatch>,
    bus: Bus,
}

impl EventsHandler {
    pub fn new(subs: Arc<dyn SubscriptionStore>, dispatcher: Arc<dyn Dispatch>, bus: Bus) -> Self {
        Self {
            subs,
            dispatcher,
            bus,
        }
    }
}

#[async_trait]
impl Handler for EventsHandler {
    fn queue(&self) -> &'static str {
        EVENTS_QUEUE
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let event: ChangeEvent =
            serde_json::from_slice(payload).map_err(PipelineError::malformed)?;

        let url = self
            .subs
            .endpoint_url(&event.webhook_id)
            .await?
            .ok_or_else(|| PipelineError::UnknownSubscription(event.webhook_id.clone()))?;

        let webhook_id = event.webhook_id.clone();
        let envelope = DeliveredEvent::wrap(event, Utc::now());

        match self.dispatcher.dispatch(&url, &envelope).await {
            DeliveryOutcome::Accepted { status } => {
                self.bus.publish(
                    PipelineEvent::new(PipelineEventKind::DeliverySucceeded)
                        .with_webhook(webhook_id)
                        .with_status(status),
                );
            }
            DeliveryOutcome::Rejected { status } => {
                self.bus.publish(
                    PipelineEvent::new(PipelineEventKind::DeliveryFailed)
                        .with_webhook(webhook_id)
                        .with_status(status),
                );
            }
            DeliveryOutcome::Unreachable { detail } => {
                self.bus.publish(
                    PipelineEvent::new(PipelineEventKind::DeliveryFailed)
                        .with_webhook(webhook_id)
                        .with_reason(detail),
                );
            }
        }

        // The attempt itself is terminal either way.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dispatch::RecordingDispatcher;
    use crate::model::{ChangeKind, Subscription, SubscriptionStatus, TargetKind};
    use crate::store::MemoryStore;

    use super::*;

    fn subscription(id: &str, url: &str) -> Subscription {
        Subscription {
            id: id.into(),
            user_id: "user-1".into(),
            url: url.into(),
            events: vec![ChangeKind::Added],
            active: true,
            status: SubscriptionStatus::Idle,
            polling_interval_mins: 5,
            last_polled: None,
            object_id: "col-1".into(),
            object_kind: TargetKind::Collection,
        }
    }

    fn event_payload(webhook_id: &str) -> Vec<u8> {
        let ev = ChangeEvent::detected(
            ChangeKind::Added,
            webhook_id,
            "user-1",
            "item-1",
            Utc::now(),
        );
        serde_json::to_vec(&ev).unwrap()
    }

    #[tokio::test]
    async fn delivers_wrapped_event_to_the_subscription_url() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(subscription("wh-1", "http://receiver.test/hook"))
            .await
            .unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::accepting());

        let handler = EventsHandler::new(
            Arc::clone(&store) as Arc<dyn SubscriptionStore>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatch>,
            Bus::new(16),
        );
        handler.handle(&event_payload("wh-1")).await.unwrap();

        let calls = dispatcher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "http://receiver.test/hook");
        assert_eq!(calls[0].1.webhook_id, "wh-1");
        assert_eq!(calls[0].1.kind, ChangeKind::Added);
        assert!(!calls[0].1.id.is_empty());
    }

    #[tokio::test]
    async fn rejected_delivery_still_consumes_the_message() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert(subscription("wh-1", "http://receiver.test/hook"))
            .await
            .unwrap();
        let dispatcher = Arc::new(RecordingDispatcher::with_outcome(
            DeliveryOutcome::Rejected { status: 500 },
        ));

        let handler = EventsHandler::new(
            Arc::clone(&store) as Arc<dyn SubscriptionStore>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatch>,
            Bus::new(16),
        );
        // Ok means the worker acks: no redelivery for a refusing receiver.
        handler.handle(&event_payload("wh-1")).await.unwrap();
        assert_eq!(dispatcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn garbage_payload_is_a_data_error() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::accepting());
        let handler = EventsHandler::new(
            Arc::clone(&store) as Arc<dyn SubscriptionStore>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatch>,
            Bus::new(16),
        );

        let err = handler.handle(b"{not json").await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_subscription_is_a_data_error() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::accepting());
        let handler = EventsHandler::new(
            Arc::clone(&store) as Arc<dyn SubscriptionStore>,
            Arc::clone(&dispatcher) as Arc<dyn Dispatch>,
            Bus::new(16),
        );

        let err = handler.handle(&event_payload("wh-ghost")).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(dispatcher.calls().is_empty());
    }
}
