//! Pipeline runtime: wires the collaborators together and runs them.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   Config + collaborators  ──►  Pipeline::run()
//!
//!   Scheduler (timer loop)
//!     └─► claim_due() ──► publish id ──► "processing"
//!
//!   Worker loops (per queue, counts from Config):
//!     "processing"   ──► ProcessingHandler  (fetch → diff → persist → fan out)
//!     "events"       ──► EventsHandler      (wrap → deliver webhook)
//!     "initial-poll" ──► InitialPollHandler (fetch → seed snapshot)
//!
//!   wait_for_shutdown_signal()
//!     └─► Bus.publish(ShutdownRequested)
//!     └─► token.cancel()   → scheduler and workers stop at safe points
//!     └─► wait up to Config::grace:
//!            ├─ all joined  → Bus.publish(AllDrainedWithinGrace)
//!            └─ timeout     → Bus.publish(GraceExceeded), Err
//! ```
//!
//! ## Rules
//! - All consumers are opened before anything is spawned; a partial
//!   pipeline never runs.
//! - In-flight handler work finishes before its loop observes the cancel;
//!   cancellation is only checked between messages.
//! - Worker counts are clamped to a minimum of one per queue.

mod events;
mod initial_poll;
mod processing;
mod shutdown;

pub use events::EventsHandler;
pub use initial_poll::InitialPollHandler;
pub use processing::ProcessingHandler;
pub use shutdown::wait_for_shutdown_signal;

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::dispatch::Dispatch;
use crate::error::RuntimeError;
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};
use crate::queue::{run_worker, Broker, Consume, Handler};
use crate::source::CollectionSource;
use crate::store::{SnapshotStore, SubscriptionStore};
use crate::scheduler::Scheduler;

/// The assembled pipeline: scheduler plus one worker pool per queue.
pub struct Pipeline {
    cfg: Config,
    subs: Arc<dyn SubscriptionStore>,
    snapshots: Arc<dyn SnapshotStore>,
    source: Arc<dyn CollectionSource>,
    broker: Arc<dyn Broker>,
    dispatcher: Arc<dyn Dispatch>,
    bus: Bus,
}

impl Pipeline {
    pub fn new(
        cfg: Config,
        subs: Arc<dyn SubscriptionStore>,
        snapshots: Arc<dyn SnapshotStore>,
        source: Arc<dyn CollectionSource>,
        broker: Arc<dyn Broker>,
        dispatcher: Arc<dyn Dispatch>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            cfg,
            subs,
            snapshots,
            source,
            broker,
            dispatcher,
            bus,
        }
    }

    /// Observability bus shared by every component; subscribe before
    /// calling [`run`](Pipeline::run) to see startup events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs until a termination signal arrives, then drains within
    /// [`Config::grace`].
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        let mut set = self.spawn_all(&token).await?;

        tokio::select! {
            signal = wait_for_shutdown_signal() => {
                signal?;
                self.bus
                    .publish(PipelineEvent::new(PipelineEventKind::ShutdownRequested));
                token.cancel();
                self.wait_all_with_grace(&mut set).await
            }
            _ = async { while set.join_next().await.is_some() {} } => Ok(()),
        }
    }

    /// Runs until `token` is cancelled. Used by tests and embedders that
    /// own signal handling themselves.
    pub async fn run_until_cancelled(
        &self,
        token: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let mut set = self.spawn_all(&token).await?;

        token.cancelled().await;
        self.wait_all_with_grace(&mut set).await
    }

    /// Opens every consumer, then spawns the scheduler and the worker
    /// loops into one join set.
    async fn spawn_all(
        &self,
        token: &CancellationToken,
    ) -> Result<JoinSet<()>, RuntimeError> {
        let handlers: [(Arc<dyn Handler>, usize); 3] = [
            (
                Arc::new(ProcessingHandler::new(
                    Arc::clone(&self.subs),
                    Arc::clone(&self.snapshots),
                    Arc::clone(&self.source),
                    Arc::clone(&self.broker),
                    self.bus.clone(),
                )),
                self.cfg.processing_workers.max(1),
            ),
            (
                Arc::new(EventsHandler::new(
                    Arc::clone(&self.subs),
                    Arc::clone(&self.dispatcher),
                    self.bus.clone(),
                )),
                self.cfg.delivery_workers.max(1),
            ),
            (
                Arc::new(InitialPollHandler::new(
                    Arc::clone(&self.subs),
                    Arc::clone(&self.snapshots),
                    Arc::clone(&self.source),
                    self.bus.clone(),
                )),
                self.cfg.bootstrap_workers.max(1),
            ),
        ];

        // Open every consumer before spawning anything, so a broker
        // refusal aborts startup instead of leaving a half-wired pipeline.
        let mut consumers: Vec<(Box<dyn Consume>, Arc<dyn Handler>)> = Vec::new();
        for (handler, count) in handlers {
            for _ in 0..count {
                let consumer = self
                    .broker
                    .consumer(handler.queue())
                    .await
                    .map_err(|source| RuntimeError::ConsumerSetup {
                        queue: handler.queue(),
                        source,
                    })?;
                consumers.push((consumer, Arc::clone(&handler)));
            }
        }

        let mut set = JoinSet::new();

        let scheduler = Scheduler::new(
            Arc::clone(&self.subs),
            Arc::clone(&self.broker),
            self.bus.clone(),
            self.cfg.clone(),
        );
        set.spawn(scheduler.run(token.child_token()));

        for (consumer, handler) in consumers {
            set.spawn(run_worker(
                consumer,
                handler,
                self.bus.clone(),
                token.child_token(),
            ));
        }

        info!(
            processing = self.cfg.processing_workers.max(1),
            delivery = self.cfg.delivery_workers.max(1),
            bootstrap = self.cfg.bootstrap_workers.max(1),
            "pipeline started"
        );
        Ok(set)
    }

    /// Waits for every spawned loop to finish within [`Config::grace`].
    async fn wait_all_with_grace(&self, set: &mut JoinSet<()>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let drained = async { while set.join_next().await.is_some() {} };

        match tokio::time::timeout(grace, drained).await {
            Ok(()) => {
                self.bus
                    .publish(PipelineEvent::new(PipelineEventKind::AllDrainedWithinGrace));
                Ok(())
            }
            Err(_) => {
                self.bus
                    .publish(PipelineEvent::new(PipelineEventKind::GraceExceeded));
                Err(RuntimeError::GraceExceeded { grace })
            }
        }
    }
}
