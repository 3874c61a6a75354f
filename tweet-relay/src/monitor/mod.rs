//! Detection-and-delivery pipeline.

mod detector;
mod service;

pub use detector::{ChangeDetector, DetectionState, Evaluation};
pub use service::{CycleOutcome, RelayService};
