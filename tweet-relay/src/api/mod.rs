//! Health HTTP surface for hosting-platform liveness checks.

pub mod routes;
pub mod server;

pub use server::{AppState, HealthServer};
