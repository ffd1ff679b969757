//! Programmable dispatcher double for pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::model::DeliveredEvent;

use super::{Dispatch, DeliveryOutcome};

/// Records every delivery and answers with a preset outcome.
pub struct RecordingDispatcher {
    outcome: Mutex<DeliveryOutcome>,
    calls: Mutex<Vec<(String, DeliveredEvent)>>,
}

impl RecordingDispatcher {
    pub fn accepting() -> Self {
        Self::with_outcome(DeliveryOutcome::Accepted { status: 200 })
    }

    pub fn with_outcome(outcome: DeliveryOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: DeliveryOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<(String, DeliveredEvent)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dispatch for RecordingDispatcher {
    async fn dispatch(&self, url: &str, event: &DeliveredEvent) -> DeliveryOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), event.clone()));
        self.outcome.lock().unwrap().clone()
    }
}
