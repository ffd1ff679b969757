//! Global runtime configuration.
//!
//! [`Config`] collects every tunable the pipeline runtime reads: the
//! scheduler period, worker counts per queue, HTTP timings, and shutdown
//! behavior. All fields are plain public data; the binary fills them from
//! the environment, tests override what they need.
//!
//! ## Sentinel values
//! - worker counts are clamped to a minimum of 1 by the pipeline
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::time::Duration;

/// Runtime configuration for the pipeline.
///
/// ## Field semantics
/// - `poll_period`: scheduler tick period. Fixed wall-clock cadence; no
///   jitter and no backpressure from queue depth by design.
/// - `processing_workers` / `delivery_workers` / `bootstrap_workers`:
///   concurrent consumers per queue. Keep `processing_workers` at 1 unless
///   cross-cycle event ordering is irrelevant downstream: with more than
///   one, a slow diff cycle can be overtaken by a later cycle for the same
///   subscription.
/// - `grace`: maximum wait for worker loops to drain after a shutdown
///   signal before `run()` gives up with `RuntimeError::GraceExceeded`.
/// - `request_timeout`: per-request timeout for both outbound HTTP clients
///   (collection fetch and webhook delivery).
/// - `page_pause`: fixed delay between paginated collection-fetch requests
///   (remote rate-limit courtesy).
/// - `bus_capacity`: observability bus ring-buffer size; lagging drains
///   skip old events rather than blocking publishers.
#[derive(Clone, Debug)]
pub struct Config {
    /// Scheduler tick period.
    pub poll_period: Duration,
    /// Concurrent consumers on the processing queue.
    pub processing_workers: usize,
    /// Concurrent consumers on the events queue.
    pub delivery_workers: usize,
    /// Concurrent consumers on the initial-poll queue.
    pub bootstrap_workers: usize,
    /// Graceful-shutdown window.
    pub grace: Duration,
    /// Outbound HTTP request timeout.
    pub request_timeout: Duration,
    /// Pause between paginated collection-fetch requests.
    pub page_pause: Duration,
    /// Observability bus capacity.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Defaults match the deployed service:
    ///
    /// - `poll_period = 30s`
    /// - one worker per queue
    /// - `grace = 10s`
    /// - `request_timeout = 30s`
    /// - `page_pause = 334ms` (3 requests/second)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(30),
            processing_workers: 1,
            delivery_workers: 1,
            bootstrap_workers: 1,
            grace: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            page_pause: Duration::from_millis(334),
            bus_capacity: 1024,
        }
    }
}
