//! Process health state shared between the relay and the health endpoint.

mod health;

pub use health::{HealthSnapshot, HealthStatus, RelayHealth};
