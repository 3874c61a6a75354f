//! Periodic cycle scheduling.
//!
//! The scheduler:
//! - runs one cycle immediately, then once per interval
//! - awaits each cycle before waiting for the next tick
//! - logs cycle errors and keeps going
//! - stops between ticks when its cancellation token fires

mod service;
mod ticker;

pub use service::{CycleRunner, Scheduler};
pub use ticker::{IntervalTicker, Ticker};
