//! HTTP collection source: cursor-paginated queries with fixed pacing.
//!
//! The remote API exposes one endpoint per collection:
//!
//! ```text
//! POST {base}/collections/{id}/query
//! body: {} | {"start_cursor": "..."}
//! 200:  {"results":[{"id","modified_at",...}],"has_more":bool,"next_cursor":...}
//! ```
//!
//! The fetch loop follows cursors until `has_more` is false, waiting a
//! fixed pause before every request to respect the remote rate limit.
//! A per-request timeout is set on the client; there is no retry here —
//! any failure abandons the whole fetch and the poll cycle with it.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{interval, MissedTickBehavior};

use crate::model::{CollectionState, ItemRecord};

use super::{CollectionSource, SourceError};

#[derive(Deserialize)]
struct QueryPage {
    results: Vec<WireItem>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct WireItem {
    id: String,
    modified_at: String,
    #[serde(flatten)]
    fields: serde_json::Value,
}

/// Paginated, paced HTTP implementation of [`CollectionSource`].
pub struct HttpCollectionSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    page_pause: Duration,
}

impl HttpCollectionSource {
    /// Builds a source against `base_url` (no trailing slash) with the
    /// given per-request timeout and inter-request pacing.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        request_timeout: Duration,
        page_pause: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SourceError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
            page_pause,
        })
    }

    async fn query_page(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<QueryPage, SourceError> {
        let url = format!("{}/collections/{}/query", self.base_url, collection_id);
        let mut req = self.client.post(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let body = match cursor {
            Some(c) => serde_json::json!({ "start_cursor": c }),
            None => serde_json::json!({}),
        };

        let resp = req
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }
        resp.json::<QueryPage>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CollectionSource for HttpCollectionSource {
    async fn fetch(&self, collection_id: &str) -> Result<CollectionState, SourceError> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        let mut pacing = interval(self.page_pause.max(Duration::from_millis(1)));
        pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            pacing.tick().await;
            let page = self.query_page(collection_id, cursor.as_deref()).await?;

            items.extend(page.results.into_iter().map(|w| ItemRecord {
                id: w.id,
                modified_at: w.modified_at,
                fields: w.fields,
            }));

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(CollectionState { items })
    }
}
