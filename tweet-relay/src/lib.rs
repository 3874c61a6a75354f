//! tweet-relay library crate.
//!
//! Polls one X/Twitter account and forwards each new post to a Discord
//! webhook exactly once.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notification;
pub mod scheduler;
pub mod services;
pub mod source;
pub mod utils;

pub use error::{Error, Result};
