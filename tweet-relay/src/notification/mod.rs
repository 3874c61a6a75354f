//! Notification formatting, mention resolution and delivery.

pub mod channels;
pub mod discord_bot;
pub mod formatter;
pub mod mention;

pub use channels::{Deliverer, DiscordWebhook, DiscordWebhookConfig, WebhookMessage};
pub use discord_bot::DiscordBot;
pub use formatter::{NotificationPayload, build_payload};
pub use mention::{MentionResolver, MentionTarget, MentionTier, RoleDirectory};
