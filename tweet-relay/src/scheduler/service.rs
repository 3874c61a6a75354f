use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ticker::Ticker;
use crate::Result;
use crate::monitor::CycleOutcome;

/// Something that runs one relay cycle.
#[async_trait]
pub trait CycleRunner: Send + Sync + 'static {
    async fn run_cycle(&self) -> Result<CycleOutcome>;
}

/// Drives a [`CycleRunner`] from a [`Ticker`] until cancelled.
pub struct Scheduler<R, T> {
    runner: Arc<R>,
    ticker: T,
    cancellation_token: CancellationToken,
}

impl<R, T> Scheduler<R, T>
where
    R: CycleRunner,
    T: Ticker,
{
    pub fn new(runner: Arc<R>, ticker: T, cancellation_token: CancellationToken) -> Self {
        Self {
            runner,
            ticker,
            cancellation_token,
        }
    }

    /// Run until the token is cancelled. Returns the number of cycles run.
    pub async fn run(mut self) -> u64 {
        info!("Scheduler started");
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation_token.cancelled() => {
                    info!("Scheduler received cancellation signal");
                    break;
                }

                _ = self.ticker.tick() => {}
            }

            cycles += 1;
            match self.runner.run_cycle().await {
                Ok(CycleOutcome::Delivered(id)) => {
                    debug!(cycle = cycles, item_id = %id, "Cycle delivered an item");
                }
                Ok(outcome) => debug!(cycle = cycles, ?outcome, "Cycle finished"),
                Err(e) if e.is_fatal() => {
                    error!(cycle = cycles, error = %e, "Cycle aborted; state unchanged");
                }
                Err(e) => warn!(cycle = cycles, error = %e, "Cycle aborted; state unchanged"),
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}
