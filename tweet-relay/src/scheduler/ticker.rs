use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Source of scheduling ticks.
#[async_trait]
pub trait Ticker: Send {
    /// Resolve at the next tick.
    async fn tick(&mut self);
}

/// Fixed-period ticker. The first tick completes immediately.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// `period` must be non-zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        // A cycle that overruns the period pushes the schedule back instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
