//! Storage seams for subscriptions and snapshots.
//!
//! Storage is an external collaborator: this module defines only the
//! operations the pipeline needs, as async traits, plus an in-memory
//! implementation used by tests and the demo binary. A production
//! deployment supplies its own implementations behind the same traits.
//!
//! ## The claim contract
//! [`SubscriptionStore::claim_due`] is the one concurrency-critical
//! operation in the system: it must select every due, active, idle
//! subscription **and** flip it to `processing` as a single atomic step.
//! Two overlapping scheduler ticks must never both claim the same row.
//! An implementation that cannot guarantee this is unsafe to run with
//! more than one scheduler instance.

mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{CollectionState, Subscription};

pub use memory::MemoryStore;

/// Storage failure. Always treated as transient by the handlers.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Read/write operations on subscription rows.
#[async_trait]
pub trait SubscriptionStore: Send + Sync + 'static {
    /// Fetches one subscription by id.
    async fn get(&self, id: &str) -> Result<Option<Subscription>, StoreError>;

    /// Fetches just the endpoint URL for a subscription.
    async fn endpoint_url(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Atomically claims every due subscription (active, idle, past due at
    /// `now`), transitioning each to `processing`, and returns the claimed
    /// ids. See the module docs for the atomicity requirement.
    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Releases a claim: status back to `idle`, and when `polled_at` is
    /// set, `last_polled` refreshed to it. Handlers call this on every
    /// exit path; error paths pass `None` so the next tick retries soon
    /// instead of waiting out a full interval.
    async fn release(&self, id: &str, polled_at: Option<DateTime<Utc>>) -> Result<(), StoreError>;

    /// Inserts or replaces a subscription row. Subscription creation is
    /// external to the pipeline; this exists for bootstrap flows and tests.
    async fn insert(&self, sub: Subscription) -> Result<(), StoreError>;
}

/// Read/write operations on the two snapshot halves.
///
/// Both halves are overwritten wholesale once per poll cycle; there are no
/// partial updates and no retained history.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Last-observed item-ID set, `None` before the first poll.
    async fn item_ids(&self, webhook_id: &str) -> Result<Option<HashSet<String>>, StoreError>;

    /// Last-observed full collection state, `None` before the first poll.
    async fn collection(&self, webhook_id: &str)
        -> Result<Option<CollectionState>, StoreError>;

    /// Upserts the item-ID half.
    async fn put_item_ids(
        &self,
        webhook_id: &str,
        user_id: &str,
        ids: &HashSet<String>,
    ) -> Result<(), StoreError>;

    /// Upserts the full-state half.
    async fn put_collection(
        &self,
        webhook_id: &str,
        user_id: &str,
        state: &CollectionState,
    ) -> Result<(), StoreError>;
}
