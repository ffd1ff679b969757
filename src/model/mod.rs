//! Domain types: subscriptions, collection state, snapshots, and the wire
//! payloads exchanged over the queues and delivered to subscriber endpoints.

mod collection;
mod event;
mod subscription;

pub use collection::{CollectionState, ItemRecord, Snapshot};
pub use event::{ChangeEvent, DeliveredEvent, EventData, InitialPollRequest};
pub use subscription::{ChangeKind, Subscription, SubscriptionStatus, TargetKind};
