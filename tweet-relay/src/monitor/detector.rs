//! New-item detection.
//!
//! Only the newest scanned item is compared with the last delivered one.
//! Items published and superseded within a single polling interval are never
//! seen, and a failed delivery is dropped if a newer item appears before the
//! next cycle. There is no backlog of missed items.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::source::{Item, ItemId};

/// Dedup state.
///
/// `last_delivered_id` is `Some` exactly when `initialized` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionState {
    pub initialized: bool,
    pub last_delivered_id: Option<ItemId>,
}

/// Result of evaluating a scanned candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// First observation: state seeded, nothing to deliver.
    Seeded(ItemId),
    /// Candidate is the last delivered item.
    Unchanged(ItemId),
    /// Candidate differs from the last delivered item. State is not advanced
    /// until [`ChangeDetector::advance`] confirms delivery.
    New(ItemId),
}

impl Evaluation {
    pub fn is_new(&self) -> bool {
        matches!(self, Evaluation::New(_))
    }
}

/// Two-state machine: uninitialized until the first scan, then tracking.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    state: DetectionState,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    /// Classify a scanned candidate. Mutates state only on the seeding scan.
    pub fn evaluate(&mut self, candidate: &Item) -> Evaluation {
        let id = candidate.id.clone();

        if !self.state.initialized {
            self.state.initialized = true;
            self.state.last_delivered_id = Some(id.clone());
            info!(item_id = %id, "Detector seeded with newest item");
            return Evaluation::Seeded(id);
        }

        if self.state.last_delivered_id.as_ref() == Some(&id) {
            debug!(item_id = %id, "No new item");
            Evaluation::Unchanged(id)
        } else {
            info!(
                item_id = %id,
                last_delivered = ?self.state.last_delivered_id.as_ref().map(ItemId::as_str),
                "New item detected"
            );
            Evaluation::New(id)
        }
    }

    /// Record a confirmed delivery.
    pub fn advance(&mut self, id: ItemId) {
        if !self.state.initialized {
            warn!(item_id = %id, "advance called before the detector was seeded");
            self.state.initialized = true;
        }
        debug!(item_id = %id, "Advancing last delivered item");
        self.state.last_delivered_id = Some(id);
    }
}
