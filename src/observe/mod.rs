//! Pipeline observability: a broadcast event bus plus a log drain.
//!
//! Every interesting runtime moment (claims, handler failures, delivery
//! outcomes, shutdown milestones) is published as a [`PipelineEvent`] on
//! the [`Bus`]. Publishing never blocks and never fails; with no
//! receivers the event is simply dropped, and a lagging receiver skips
//! old events instead of slowing publishers down.
//!
//! The [`spawn_log_drain`] task is the default consumer, translating
//! events into `tracing` records. Tests subscribe directly to assert on
//! pipeline behavior without poking at internals.

mod bus;
mod event;
mod log;

pub use bus::Bus;
pub use event::{PipelineEvent, PipelineEventKind};
pub use log::spawn_log_drain;
