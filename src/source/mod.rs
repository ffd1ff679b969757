//! Collection source seam: fetching the current full state of a remote
//! collection.
//!
//! The remote API is an external collaborator. [`CollectionSource`] is the
//! boundary the diff engine sees: one call returning the complete item
//! list with identifiers and last-modified markers. Pagination, pacing and
//! authentication are the implementation's business
//! ([`HttpCollectionSource`] handles all three; [`StaticSource`] is the
//! in-memory stand-in for tests and demos).

mod http;
mod fixed;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::CollectionState;

pub use fixed::StaticSource;
pub use http::HttpCollectionSource;

/// Fetch failure. Always treated as transient by the handlers; the current
/// poll cycle is abandoned and broker redelivery retries it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SourceError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(String),
    /// The remote answered with a non-success status.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code received.
        status: u16,
    },
    /// The response body did not decode.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Fetches the current full state of one remote collection.
#[async_trait]
pub trait CollectionSource: Send + Sync + 'static {
    /// Returns the complete current item list for `collection_id`.
    async fn fetch(&self, collection_id: &str) -> Result<CollectionState, SourceError>;
}
