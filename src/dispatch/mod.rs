//! Outbound webhook delivery.
//!
//! Delivery is best effort by contract: a dispatch never returns `Err`.
//! The outcome is a plain enum the caller turns into observability
//! events, and the message that produced it is acked either way. There
//! are no retries, no dead-lettering, and no response-body inspection
//! beyond the status class.
//!
//! ## Rules
//! - Any 2xx status is [`DeliveryOutcome::Accepted`].
//! - Any other status is [`DeliveryOutcome::Rejected`].
//! - Transport failures (refused, timeout, DNS) are
//!   [`DeliveryOutcome::Unreachable`].

mod http;

#[cfg(test)]
mod recording;

pub use http::HttpDispatcher;

#[cfg(test)]
pub use recording::RecordingDispatcher;

use async_trait::async_trait;

use crate::model::DeliveredEvent;

/// Terminal result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The receiver answered with a 2xx status.
    Accepted { status: u16 },
    /// The receiver answered with a non-2xx status.
    Rejected { status: u16 },
    /// The request never produced an HTTP response.
    Unreachable { detail: String },
}

impl DeliveryOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, DeliveryOutcome::Accepted { .. })
    }
}

/// Pushes one event envelope at a receiver endpoint.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, url: &str, event: &DeliveredEvent) -> DeliveryOutcome;
}
