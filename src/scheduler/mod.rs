//! Polling scheduler: claims due subscriptions and enqueues them.
//!
//! A single timer-driven loop. Every tick it asks the store to atomically
//! claim every subscription that is active, idle, and past due, then
//! publishes each claimed id onto the processing queue. The cadence is a
//! fixed wall-clock period — no jitter, no backoff, and no backpressure
//! from downstream queue depth.
//!
//! Concurrency correctness rests entirely on the store's atomic claim
//! (see [`SubscriptionStore::claim_due`]); the scheduler itself holds no
//! locks and keeps no state between ticks.
//!
//! ## Failure semantics
//! Claim failures are logged and the tick is skipped. A publish failure
//! *after* a successful claim is logged and announced on the bus; the
//! affected subscription stays `processing` until something releases it.
//! That parked state is a known liveness hazard of the claim-then-enqueue
//! split, accepted because the alternative (enqueue-then-claim) double-
//! processes instead.

use std::sync::Arc;

use chrono::Utc;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::Config;
use crate::observe::{Bus, PipelineEvent, PipelineEventKind};
use crate::queue::{Broker, PROCESSING_QUEUE};
use crate::store::SubscriptionStore;

/// The periodic claim-and-enqueue loop.
pub struct Scheduler {
    store: Arc<dyn SubscriptionStore>,
    broker: Arc<dyn Broker>,
    bus: Bus,
    cfg: Config,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        broker: Arc<dyn Broker>,
        bus: Bus,
        cfg: Config,
    ) -> Self {
        Self {
            store,
            broker,
            bus,
            cfg,
        }
    }

    /// Runs tick after tick until the token is cancelled.
    ///
    /// Errors never stop the loop; each tick stands alone.
    pub async fn run(self, token: CancellationToken) {
        info!(period = ?self.cfg.poll_period, "scheduler started");
        let mut ticker = time::interval(self.cfg.poll_period);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // An interval fires immediately; consume that so the first real
        // tick lands one full period after startup.
        ticker.tick().await;

        loop {
            select! {
                _ = ticker.tick() => self.tick().await,
                _ = token.cancelled() => break,
            }
        }
    }

    /// One tick: claim everything due, enqueue each claimed id.
    pub async fn tick(&self) {
        let claimed = match self.store.claim_due(Utc::now()).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "failed to claim due subscriptions");
                return;
            }
        };

        if !claimed.is_empty() {
            self.bus.publish(
                PipelineEvent::new(PipelineEventKind::SubscriptionsClaimed)
                    .with_count(claimed.len()),
            );
        }

        for id in claimed {
            if let Err(e) = self
                .broker
                .publish(PROCESSING_QUEUE, id.clone().into_bytes())
                .await
            {
                error!(webhook = %id, error = %e, "failed to enqueue claimed subscription");
                self.bus.publish(
                    PipelineEvent::new(PipelineEventKind::EnqueueFailed)
                        .with_webhook(id)
                        .with_reason(e.to_string()),
                );
            }
        }
    }
}
