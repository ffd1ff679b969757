//! Point-in-time views of a remote collection and the persisted snapshot.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// One item of a remote collection as the source reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Stable item identity within the collection.
    pub id: String,
    /// Opaque last-modified marker. Compared for equality only; the engine
    /// never parses or orders it.
    pub modified_at: String,
    /// Remaining item fields, carried through untouched.
    #[serde(default)]
    pub fields: serde_json::Value,
}

/// Full state of a collection at one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionState {
    /// Every item currently in the collection, order insignificant.
    pub items: Vec<ItemRecord>,
}

impl CollectionState {
    /// Set of item ids present in this state.
    pub fn item_ids(&self) -> HashSet<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    /// Item id → last-modified marker index for update detection.
    pub fn marker_index(&self) -> HashMap<&str, &str> {
        self.items
            .iter()
            .map(|i| (i.id.as_str(), i.modified_at.as_str()))
            .collect()
    }
}

/// The persisted per-subscription snapshot: the last-observed item-ID set
/// plus the last-observed full collection state.
///
/// The two halves are stored and overwritten independently (wholesale, no
/// merge) each poll cycle; no history is kept. The id set drives
/// added/deleted detection, the full state drives updated detection.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Item ids observed at the previous poll.
    pub item_ids: HashSet<String>,
    /// Full collection state observed at the previous poll.
    pub collection: CollectionState,
}

impl Snapshot {
    /// Snapshot of a freshly fetched state, ready to persist.
    pub fn of(state: &CollectionState) -> Self {
        Self {
            item_ids: state.item_ids(),
            collection: state.clone(),
        }
    }
}
