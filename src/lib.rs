//! # driftwatch
//!
//! **Driftwatch** detects changes in remote collections by periodic
//! polling and pushes them to subscriber webhooks.
//!
//! It is a queue-driven pipeline: a scheduler claims due subscriptions
//! and hands them to workers over a broker; workers fetch the remote
//! state, diff it against the last persisted snapshot, and fan detected
//! changes out to another queue, where delivery workers POST them to the
//! subscriber's endpoint. Storage, the message broker, the remote source,
//! and the delivery transport are all trait seams, so deployments supply
//! their own backends; in-memory implementations back the tests and the
//! demo binary.
//!
//! ## Architecture
//! ```text
//! ┌───────────┐  claim_due()   ┌────────────────────┐
//! │ Scheduler ├───────────────►│ SubscriptionStore  │
//! │(timer loop)│◄──────────────┤ (atomic idle ►     │
//! └─────┬─────┘  claimed ids   │  processing claim) │
//!       │                      └────────────────────┘
//!       ▼ publish id
//! ┌─────────────┐   ┌──────────────────────────────────────────┐
//! │ "processing"├──►│ ProcessingHandler                        │
//! └─────────────┘   │  fetch (CollectionSource)                │
//!                   │  diff against Snapshot (pure)            │
//! ┌─────────────┐   │  persist both snapshot halves            │
//! │"initial-poll"│  │  publish ChangeEvents                    │
//! └─────┬───────┘   │  release claim (+ last_polled)           │
//!       │           └───────────────┬──────────────────────────┘
//!       ▼                           ▼ publish event JSON
//! ┌──────────────────┐   ┌─────────────┐   ┌────────────────────┐
//! │InitialPollHandler│   │  "events"   ├──►│ EventsHandler      │
//! │ seed snapshot,   │   └─────────────┘   │  wrap envelope     │
//! │ zero events      │                     │  POST to endpoint  │
//! └──────────────────┘                     │  (best effort)     │
//!                                          └────────────────────┘
//!
//! Every component publishes PipelineEvents to a broadcast Bus;
//! spawn_log_drain() turns them into tracing output.
//! ```
//!
//! ## Acknowledgement contract
//! Workers consume with manual acknowledgement. The disposition is decided
//! in exactly one place, from the handler's error:
//!
//! | Handler result            | Disposition                      |
//! |---------------------------|----------------------------------|
//! | `Ok`                      | ack                              |
//! | retryable (store/source/queue) | nack, broker redelivers     |
//! | data error (malformed/unknown) | ack and drop (never loops)  |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use driftwatch::{
//!     Config, HttpCollectionSource, HttpDispatcher, MemoryBroker, MemoryStore,
//!     Pipeline, spawn_log_drain,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let store = Arc::new(MemoryStore::new());
//!     let source = Arc::new(HttpCollectionSource::new(
//!         "https://api.example.test",
//!         None,
//!         cfg.request_timeout,
//!         cfg.page_pause,
//!     )?);
//!     let dispatcher = Arc::new(HttpDispatcher::new(cfg.request_timeout));
//!
//!     let pipeline = Pipeline::new(
//!         cfg,
//!         Arc::clone(&store) as _,
//!         store as _,
//!         source,
//!         Arc::new(MemoryBroker::new()),
//!         dispatcher,
//!     );
//!     spawn_log_drain(pipeline.bus());
//!     pipeline.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diff;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod observe;
pub mod pipeline;
pub mod queue;
pub mod scheduler;
pub mod source;
pub mod store;

pub use config::Config;
pub use dispatch::{Dispatch, DeliveryOutcome, HttpDispatcher};
pub use error::{PipelineError, RuntimeError};
pub use model::{
    ChangeEvent, ChangeKind, CollectionState, DeliveredEvent, EventData, InitialPollRequest,
    ItemRecord, Snapshot, Subscription, SubscriptionStatus, TargetKind,
};
pub use observe::{spawn_log_drain, Bus, PipelineEvent, PipelineEventKind};
pub use pipeline::{EventsHandler, InitialPollHandler, Pipeline, ProcessingHandler};
pub use queue::{
    Broker, MemoryBroker, QueueError, EVENTS_QUEUE, INITIAL_POLL_QUEUE, PROCESSING_QUEUE,
};
pub use scheduler::Scheduler;
pub use source::{CollectionSource, HttpCollectionSource, SourceError, StaticSource};
pub use store::{MemoryStore, SnapshotStore, StoreError, SubscriptionStore};
