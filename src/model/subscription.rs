//! Subscription model and its explicit status state machine.
//!
//! A subscription ties a user-owned HTTP endpoint to one remote target
//! (a collection, or a single item) and a set of change kinds the user
//! wants relayed. The scheduler and the diff handler move `status`
//! through a two-state machine:
//!
//! ```text
//! idle ──(claim_due: active ∧ past due)──► processing
//! processing ──(handler finished, any exit path)──► idle
//! ```
//!
//! The claim transition is atomic in the store; the release transition is
//! guaranteed on every handler exit path, including errors.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

/// Kind of change a subscription can ask for.
///
/// Wire names are dot-namespaced (`item.added`, ...), matching both the
/// events-queue payload and the delivered webhook body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Item present now, absent from the previous snapshot.
    #[serde(rename = "item.added")]
    Added,
    /// Item absent now, present in the previous snapshot.
    #[serde(rename = "item.deleted")]
    Deleted,
    /// Item's last-modified marker differs from the previous snapshot.
    #[serde(rename = "item.updated")]
    Updated,
}

impl ChangeKind {
    /// Wire name, also used as a log field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "item.added",
            ChangeKind::Deleted => "item.deleted",
            ChangeKind::Updated => "item.updated",
        }
    }
}

/// What the subscription points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A whole collection of items; the only kind the diff engine handles.
    Collection,
    /// A single item. Accepted but not yet processed.
    Item,
}

/// Processing status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Eligible for the next scheduler claim.
    #[default]
    Idle,
    /// Claimed; a diff cycle is in flight. At most one per subscription.
    Processing,
}

/// A user's change-notification subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription identity (also called webhook id on the wire).
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Endpoint URL events are POSTed to.
    pub url: String,
    /// Change kinds the user subscribed to.
    pub events: Vec<ChangeKind>,
    /// Inactive subscriptions are never claimed.
    pub active: bool,
    /// Current state-machine position.
    pub status: SubscriptionStatus,
    /// Polling interval in whole minutes.
    pub polling_interval_mins: i64,
    /// Completion time of the last successful poll cycle. `None` until the
    /// first cycle finishes; a never-polled subscription is always due.
    pub last_polled: Option<DateTime<Utc>>,
    /// Remote target identity.
    pub object_id: String,
    /// Remote target kind.
    pub object_kind: TargetKind,
}

impl Subscription {
    /// Whether this subscription wants the given change kind.
    pub fn wants(&self, kind: ChangeKind) -> bool {
        self.events.contains(&kind)
    }

    /// Whether the scheduler should claim this subscription now.
    ///
    /// Due means: active, idle, and `last_polled + interval < now` (or
    /// never polled).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active || self.status != SubscriptionStatus::Idle {
            return false;
        }
        match self.last_polled {
            None => true,
            Some(at) => at + ChronoDuration::minutes(self.polling_interval_mins) < now,
        }
    }
}
