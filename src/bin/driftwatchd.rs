//! Daemon entry point.
//!
//! Wires in-memory storage and broker to the HTTP source and dispatcher,
//! reads tunables from `DRIFTWATCH_*` environment variables, and runs the
//! pipeline until a termination signal. Meant for demos and smoke tests;
//! a production deployment embeds [`driftwatch::Pipeline`] with durable
//! store and broker implementations.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;
use tracing_subscriber::EnvFilter;

use driftwatch::{
    spawn_log_drain, Config, HttpCollectionSource, HttpDispatcher, MemoryBroker, MemoryStore,
    Pipeline, SnapshotStore, SubscriptionStore,
};

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_count(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn config_from_env() -> Config {
    let defaults = Config::default();
    Config {
        poll_period: env_secs("DRIFTWATCH_POLL_PERIOD_SECS", defaults.poll_period),
        processing_workers: env_count("DRIFTWATCH_PROCESSING_WORKERS", defaults.processing_workers),
        delivery_workers: env_count("DRIFTWATCH_DELIVERY_WORKERS", defaults.delivery_workers),
        bootstrap_workers: env_count("DRIFTWATCH_BOOTSTRAP_WORKERS", defaults.bootstrap_workers),
        grace: env_secs("DRIFTWATCH_GRACE_SECS", defaults.grace),
        request_timeout: env_secs("DRIFTWATCH_REQUEST_TIMEOUT_SECS", defaults.request_timeout),
        ..defaults
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = config_from_env();

    let base_url =
        env::var("DRIFTWATCH_SOURCE_URL").unwrap_or_else(|_| "http://localhost:8080".into());
    let token = env::var("DRIFTWATCH_SOURCE_TOKEN").ok();

    let store = Arc::new(MemoryStore::new());
    let source = Arc::new(HttpCollectionSource::new(
        base_url,
        token,
        cfg.request_timeout,
        cfg.page_pause,
    )?);
    let dispatcher = Arc::new(HttpDispatcher::new(cfg.request_timeout));

    let pipeline = Pipeline::new(
        cfg,
        Arc::clone(&store) as Arc<dyn SubscriptionStore>,
        store as Arc<dyn SnapshotStore>,
        source,
        Arc::new(MemoryBroker::new()),
        dispatcher,
    );
    spawn_log_drain(pipeline.bus());

    if let Err(e) = pipeline.run().await {
        error!(error = %e, label = e.as_label(), "pipeline terminated abnormally");
        return Err(e.into());
    }
    Ok(())
}
