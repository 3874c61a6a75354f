//! One relay cycle: scan, detect, fetch detail, format, deliver, advance.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::detector::{ChangeDetector, DetectionState, Evaluation};
use crate::Result;
use crate::metrics::RelayHealth;
use crate::notification::{Deliverer, MentionTarget, build_payload};
use crate::scheduler::CycleRunner;
use crate::source::{FeedSource, ItemId};

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The scan matched nothing.
    NoItem,
    /// First observation recorded without delivering.
    Seeded(ItemId),
    /// Newest item was already delivered.
    Unchanged(ItemId),
    /// A new item was delivered and the detector advanced.
    Delivered(ItemId),
}

/// Owns the detection state and drives the pipeline.
///
/// The detector lock is held for the whole cycle, so overlapping callers
/// run one after another and never observe a half-finished cycle.
pub struct RelayService<S, D> {
    source: S,
    deliverer: D,
    mention: MentionTarget,
    detector: Mutex<ChangeDetector>,
    health: Arc<RelayHealth>,
}

impl<S, D> RelayService<S, D>
where
    S: FeedSource,
    D: Deliverer,
{
    pub fn new(source: S, deliverer: D, mention: MentionTarget, health: Arc<RelayHealth>) -> Self {
        Self {
            source,
            deliverer,
            mention,
            detector: Mutex::new(ChangeDetector::new()),
            health,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn deliverer(&self) -> &D {
        &self.deliverer
    }

    pub fn mention(&self) -> &MentionTarget {
        &self.mention
    }

    pub fn health(&self) -> &Arc<RelayHealth> {
        &self.health
    }

    /// Copy of the current detection state. Waits for an in-flight cycle.
    pub async fn detection_state(&self) -> DetectionState {
        self.detector.lock().await.state().clone()
    }

    async fn cycle(&self, detector: &mut ChangeDetector) -> Result<CycleOutcome> {
        let Some(candidate) = self.source.scan_latest().await? else {
            debug!("No qualifying items from {}", self.source.name());
            return Ok(CycleOutcome::NoItem);
        };

        let id = match detector.evaluate(&candidate) {
            Evaluation::Seeded(id) => return Ok(CycleOutcome::Seeded(id)),
            Evaluation::Unchanged(id) => return Ok(CycleOutcome::Unchanged(id)),
            Evaluation::New(id) => id,
        };

        let detail = self.source.fetch_detail(&id).await?;
        let payload = build_payload(&detail.item, &detail.author, &detail.media);

        // State only moves once the sink has confirmed.
        self.deliverer.send(&payload, &self.mention).await?;
        detector.advance(id.clone());

        info!(
            item_id = %id,
            channel = self.deliverer.channel_type(),
            "Relayed new item from {}",
            self.source.name()
        );
        Ok(CycleOutcome::Delivered(id))
    }
}

#[async_trait]
impl<S, D> CycleRunner for RelayService<S, D>
where
    S: FeedSource,
    D: Deliverer,
{
    async fn run_cycle(&self) -> Result<CycleOutcome> {
        let mut detector = self.detector.lock().await;
        let result = self.cycle(&mut detector).await;

        match &result {
            Ok(CycleOutcome::Delivered(id)) => {
                self.health.record_delivery(id.as_str());
                self.health.record_success();
            }
            Ok(_) => self.health.record_success(),
            // Reported once, by the caller that owns the loop.
            Err(e) => self.health.record_failure(e),
        }
        result
    }
}
