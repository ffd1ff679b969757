//! Settable in-memory source for tests and the demo binary.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::model::CollectionState;

use super::{CollectionSource, SourceError};

/// Serves whatever state was last [`set`](StaticSource::set) per collection.
///
/// Unknown collections fetch as empty, and the source can be switched into
/// a failing mode to exercise transient-error paths.
#[derive(Default)]
pub struct StaticSource {
    states: Mutex<HashMap<String, CollectionState>>,
    failing: Mutex<bool>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the served state for one collection.
    pub async fn set(&self, collection_id: &str, state: CollectionState) {
        self.states
            .lock()
            .await
            .insert(collection_id.to_owned(), state);
    }

    /// When `true`, every fetch fails with a transport error.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

#[async_trait]
impl CollectionSource for StaticSource {
    async fn fetch(&self, collection_id: &str) -> Result<CollectionState, SourceError> {
        if *self.failing.lock().await {
            return Err(SourceError::Request("static source set to fail".into()));
        }
        Ok(self
            .states
            .lock()
            .await
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }
}
