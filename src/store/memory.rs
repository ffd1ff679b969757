//! In-memory store used by tests and the demo binary.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::model::{CollectionState, Subscription, SubscriptionStatus};

use super::{SnapshotStore, StoreError, SubscriptionStore};

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<String, Subscription>,
    // webhook_id → (user_id, half)
    item_ids: HashMap<String, (String, HashSet<String>)>,
    collections: HashMap<String, (String, CollectionState)>,
}

/// In-memory implementation of both store traits.
///
/// One mutex guards all rows, so `claim_due` is atomic by construction:
/// the select and the status flip happen under a single lock.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a subscription, for assertions in tests.
    pub async fn status(&self, id: &str) -> Option<SubscriptionStatus> {
        self.inner
            .lock()
            .await
            .subscriptions
            .get(id)
            .map(|s| s.status)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Subscription>, StoreError> {
        Ok(self.inner.lock().await.subscriptions.get(id).cloned())
    }

    async fn endpoint_url(&self, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .subscriptions
            .get(id)
            .map(|s| s.url.clone()))
    }

    async fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut claimed = Vec::new();
        for sub in inner.subscriptions.values_mut() {
            if sub.is_due(now) {
                sub.status = SubscriptionStatus::Processing;
                claimed.push(sub.id.clone());
            }
        }
        Ok(claimed)
    }

    async fn release(&self, id: &str, polled_at: Option<DateTime<Utc>>) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if let Some(sub) = inner.subscriptions.get_mut(id) {
            sub.status = SubscriptionStatus::Idle;
            if let Some(at) = polled_at {
                sub.last_polled = Some(at);
            }
        }
        Ok(())
    }

    async fn insert(&self, sub: Subscription) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .subscriptions
            .insert(sub.id.clone(), sub);
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn item_ids(&self, webhook_id: &str) -> Result<Option<HashSet<String>>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .item_ids
            .get(webhook_id)
            .map(|(_, ids)| ids.clone()))
    }

    async fn collection(
        &self,
        webhook_id: &str,
    ) -> Result<Option<CollectionState>, StoreError> {
        Ok(self
            .inner
            .lock()
            .await
            .collections
            .get(webhook_id)
            .map(|(_, state)| state.clone()))
    }

    async fn put_item_ids(
        &self,
        webhook_id: &str,
        user_id: &str,
        ids: &HashSet<String>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .item_ids
            .insert(webhook_id.to_owned(), (user_id.to_owned(), ids.clone()));
        Ok(())
    }

    async fn put_collection(
        &self,
        webhook_id: &str,
        user_id: &str,
        state: &CollectionState,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .await
            .collections
            .insert(webhook_id.to_owned(), (user_id.to_owned(), state.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::{ChangeKind, TargetKind};

    use super::*;

    fn due_subscription(id: &str) -> Subscription {
        Subscription {
            id: id.into(),
            user_id: "user-1".into(),
            url: "http://localhost/void".into(),
            events: vec![ChangeKind::Added, ChangeKind::Deleted],
            active: true,
            status: SubscriptionStatus::Idle,
            polling_interval_mins: 5,
            last_polled: None,
            object_id: "col-1".into(),
            object_kind: TargetKind::Collection,
        }
    }

    #[tokio::test]
    async fn claim_is_exclusive_under_concurrent_ticks() {
        let store = Arc::new(MemoryStore::new());
        store.insert(due_subscription("wh-1")).await.unwrap();

        let now = Utc::now();
        let (a, b) = tokio::join!(
            {
                let store = Arc::clone(&store);
                async move { store.claim_due(now).await.unwrap() }
            },
            {
                let store = Arc::clone(&store);
                async move { store.claim_due(now).await.unwrap() }
            }
        );

        assert_eq!(a.len() + b.len(), 1, "exactly one tick claims the row");
        assert_eq!(
            store.status("wh-1").await,
            Some(SubscriptionStatus::Processing)
        );
    }

    #[tokio::test]
    async fn claimed_subscription_is_skipped_until_released() {
        let store = MemoryStore::new();
        store.insert(due_subscription("wh-1")).await.unwrap();

        assert_eq!(store.claim_due(Utc::now()).await.unwrap(), vec!["wh-1"]);
        assert!(store.claim_due(Utc::now()).await.unwrap().is_empty());

        store.release("wh-1", None).await.unwrap();
        assert_eq!(store.claim_due(Utc::now()).await.unwrap(), vec!["wh-1"]);
    }

    #[tokio::test]
    async fn release_with_polled_at_defers_the_next_claim() {
        let store = MemoryStore::new();
        store.insert(due_subscription("wh-1")).await.unwrap();

        let now = Utc::now();
        store.claim_due(now).await.unwrap();
        store.release("wh-1", Some(now)).await.unwrap();

        // Freshly polled: not due again within the interval.
        assert!(store.claim_due(now).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_halves_overwrite_wholesale() {
        let store = MemoryStore::new();
        let first: HashSet<String> = ["a".to_string(), "b".to_string()].into();
        let second: HashSet<String> = ["c".to_string()].into();

        store.put_item_ids("wh-1", "user-1", &first).await.unwrap();
        store.put_item_ids("wh-1", "user-1", &second).await.unwrap();

        assert_eq!(store.item_ids("wh-1").await.unwrap(), Some(second));
        assert_eq!(store.item_ids("wh-2").await.unwrap(), None);
    }
}
