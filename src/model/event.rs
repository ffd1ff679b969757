//! Wire payloads: queued change events, the delivered webhook body, and
//! the initial-poll bootstrap request.
//!
//! Every payload is JSON. The events-queue payload and the delivered body
//! share the `data` block; the delivered body additionally carries a fresh
//! delivery id and timestamp assigned at send time:
//!
//! ```text
//! events queue:   {"type","user_id","webhook_id","data":{...}}
//! delivered body: {"id","webhook_id","type","data":{...},"created_at"}
//! data block:     {"object_id","object_type","created_at"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subscription::{ChangeKind, TargetKind};

/// The `data` block shared by queued and delivered events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    /// Affected item id.
    pub object_id: String,
    /// Affected item kind (always `"item"` for collection diffs).
    pub object_type: String,
    /// Detection time, unix seconds. This is when the poll observed the
    /// change, not when the remote change actually happened.
    pub created_at: i64,
}

/// A detected change, as published on the events queue.
///
/// Produced by the change-detection engine, consumed exactly once by the
/// delivery handler. Never persisted beyond the queue (at-least-once up to
/// delivery, at-most-one HTTP attempt after).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Change classification.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Owning user.
    pub user_id: String,
    /// Subscription that produced the event.
    pub webhook_id: String,
    /// Affected item.
    pub data: EventData,
}

impl ChangeEvent {
    /// Builds an event for one affected item, timestamped at detection time.
    pub fn detected(
        kind: ChangeKind,
        webhook_id: &str,
        user_id: &str,
        object_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            user_id: user_id.to_owned(),
            webhook_id: webhook_id.to_owned(),
            data: EventData {
                object_id: object_id.to_owned(),
                object_type: "item".to_owned(),
                created_at: at.timestamp(),
            },
        }
    }
}

/// The body POSTed to the subscriber's endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredEvent {
    /// Unique delivery id, assigned when the event is sent.
    pub id: String,
    /// Subscription the delivery belongs to.
    pub webhook_id: String,
    /// Change classification.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Affected item (carried through from the queued event).
    pub data: EventData,
    /// Send time, unix seconds.
    pub created_at: i64,
}

impl DeliveredEvent {
    /// Wraps a queued event for delivery with a fresh id and timestamp.
    pub fn wrap(event: ChangeEvent, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            webhook_id: event.webhook_id,
            kind: event.kind,
            data: event.data,
            created_at: at.timestamp(),
        }
    }
}

/// Bootstrap request for a newly created subscription, as published on the
/// initial-poll queue by the subscription-creation flow.
///
/// The producer of this queue lives outside this repo, so the wire keys
/// carry the vendor prefix it already uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialPollRequest {
    /// Subscription to seed.
    pub webhook_id: String,
    /// Owning user.
    pub user_id: String,
    /// Remote target identity.
    #[serde(rename = "notion_object_id")]
    pub object_id: String,
    /// Remote target kind.
    #[serde(rename = "notion_object_type")]
    pub object_type: TargetKind,
}
