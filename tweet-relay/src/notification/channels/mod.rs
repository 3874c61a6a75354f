//! Delivery channels.

mod discord;

pub use discord::{DiscordWebhook, DiscordWebhookConfig, WebhookMessage};

use async_trait::async_trait;

use super::formatter::NotificationPayload;
use super::mention::MentionTarget;
use crate::Result;

/// Posts formatted notifications to the sink.
///
/// `Ok(())` means the sink confirmed acceptance; any `Err` is a failed
/// delivery and leaves the item eligible for the next cycle.
#[async_trait]
pub trait Deliverer: Send + Sync + 'static {
    /// Get the channel type name.
    fn channel_type(&self) -> &'static str;

    async fn send(&self, payload: &NotificationPayload, mention: &MentionTarget) -> Result<()>;
}
