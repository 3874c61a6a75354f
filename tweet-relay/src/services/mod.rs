//! Application wiring and lifecycle.

mod container;

pub use container::{Relay, ServiceContainer, shutdown_signal};
