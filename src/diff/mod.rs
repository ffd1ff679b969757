//! Change-detection engine.
//!
//! Pure functions turning (previous snapshot, current collection state)
//! into the events a subscription should see and the snapshot to persist.
//! No I/O happens here; the processing handler owns fetching and storage.
//!
//! ## Semantics
//! - **added** = current ids − previous ids; **deleted** = previous ids −
//!   current ids. Set membership only, never ordering; the two sets are
//!   disjoint by construction.
//! - **updated**: an item whose last-modified marker differs from the one
//!   recorded for the same id in the previous full state, or whose id the
//!   previous state never saw. An item added this cycle with a fresh
//!   marker therefore yields *both* `added` and `updated`; downstream
//!   consumers dedupe by object id if they care.
//! - All three sets are computed unconditionally, then filtered once
//!   against the subscription's kinds. No per-kind branching.
//! - Events carry the detection timestamp, not the remote change time
//!   (unknowable under polling).
//! - Output order among same-kind events is unspecified.
//!
//! ## Bootstrap mode
//! With no previous snapshot there is nothing to diff against:
//! [`bootstrap`] produces only the initial snapshot and zero events.

use chrono::{DateTime, Utc};

use crate::model::{ChangeEvent, ChangeKind, CollectionState, Snapshot, Subscription};

/// Result of one diff cycle: the events to publish and the snapshot to
/// persist. The snapshot is always fresh, whether or not any kind matched.
#[derive(Debug)]
pub struct DiffOutcome {
    /// Detected events, already filtered to the subscribed kinds.
    pub events: Vec<ChangeEvent>,
    /// New snapshot to persist wholesale.
    pub snapshot: Snapshot,
}

/// Diffs the current collection state against the previous snapshot for
/// one subscription.
pub fn diff(
    sub: &Subscription,
    previous: &Snapshot,
    current: &CollectionState,
    at: DateTime<Utc>,
) -> DiffOutcome {
    let current_ids = current.item_ids();
    let previous_markers = previous.collection.marker_index();

    let mut detected: Vec<(ChangeKind, &str)> = Vec::new();

    for id in &current_ids {
        if !previous.item_ids.contains(id) {
            detected.push((ChangeKind::Added, id));
        }
    }
    for id in &previous.item_ids {
        if !current_ids.contains(id) {
            detected.push((ChangeKind::Deleted, id));
        }
    }
    for item in &current.items {
        match previous_markers.get(item.id.as_str()) {
            Some(marker) if *marker == item.modified_at => {}
            _ => detected.push((ChangeKind::Updated, &item.id)),
        }
    }

    let events = detected
        .into_iter()
        .filter(|(kind, _)| sub.wants(*kind))
        .map(|(kind, id)| ChangeEvent::detected(kind, &sub.id, &sub.user_id, id, at))
        .collect();

    DiffOutcome {
        events,
        snapshot: Snapshot::of(current),
    }
}

/// Bootstrap mode: first poll for a subscription. Seeds the snapshot,
/// emits nothing.
pub fn bootstrap(current: &CollectionState) -> Snapshot {
    Snapshot::of(current)
}
