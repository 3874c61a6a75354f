//! Discord webhook delivery.
//!
//! Rate limit handling follows Discord's guidance:
//! - 429 responses are retried after `Retry-After` / `X-RateLimit-Reset-After`
//! - 5xx responses and transport timeouts back off exponentially
//! - any other non-204 status fails immediately

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::Deliverer;
use crate::notification::formatter::{Embed, NotificationPayload};
use crate::notification::mention::MentionTarget;
use crate::utils::retry::{Backoff, RetryPolicy, retry_with_backoff};
use crate::{Error, Result};

/// Webhook channel configuration.
#[derive(Debug, Clone, Default)]
pub struct DiscordWebhookConfig {
    /// Discord webhook URL.
    pub webhook_url: String,
    /// Optional username override for the webhook.
    pub username: Option<String>,
    /// Optional avatar override for the webhook.
    pub avatar_url: Option<String>,
}

/// Message-create body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub content: String,
    pub embeds: Vec<Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Failure of a single POST.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    RateLimited(Option<Duration>),
    Status { status: StatusCode, body: String },
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "request failed: {e}"),
            AttemptError::RateLimited(wait) => write!(f, "rate limited (retry after {wait:?})"),
            AttemptError::Status { status, body } => write!(f, "{status} - {body}"),
        }
    }
}

/// Discord webhook deliverer.
pub struct DiscordWebhook {
    config: DiscordWebhookConfig,
    client: Client,
    retry: RetryPolicy,
}

impl DiscordWebhook {
    pub fn new(client: Client, config: DiscordWebhookConfig) -> Self {
        Self {
            config,
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Build the final wire message with the mention prefix.
    pub fn build_message(
        &self,
        payload: &NotificationPayload,
        mention: &MentionTarget,
    ) -> WebhookMessage {
        WebhookMessage {
            content: mention.render(&payload.headline),
            embeds: vec![payload.embed.clone()],
            username: self.config.username.clone(),
            avatar_url: self.config.avatar_url.clone(),
        }
    }

    async fn post_once(&self, message: &WebhookMessage) -> std::result::Result<(), AttemptError> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(message)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        // Webhooks without `?wait=true` answer 204; anything else is not a confirmed delivery.
        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited(parse_retry_after(
                response.headers(),
            )));
        }

        let body = response.text().await.unwrap_or_default();
        Err(AttemptError::Status { status, body })
    }
}

fn classify(err: &AttemptError) -> Backoff {
    match err {
        AttemptError::Transport(e) if e.is_timeout() || e.is_connect() => Backoff::Retry,
        AttemptError::Transport(_) => Backoff::Stop,
        AttemptError::RateLimited(Some(wait)) => Backoff::RetryAfter(*wait),
        AttemptError::RateLimited(None) => Backoff::RetryAfter(Duration::from_secs(1)),
        AttemptError::Status { status, .. } if status.is_server_error() => Backoff::Retry,
        AttemptError::Status { .. } => Backoff::Stop,
    }
}

/// Parse the wait requested by a 429 response.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    ["Retry-After", "X-RateLimit-Reset-After"]
        .into_iter()
        .find_map(|name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        })
}

#[async_trait]
impl Deliverer for DiscordWebhook {
    fn channel_type(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, payload: &NotificationPayload, mention: &MentionTarget) -> Result<()> {
        let message = self.build_message(payload, mention);

        retry_with_backoff("Discord webhook", &self.retry, classify, || {
            self.post_once(&message)
        })
        .await
        .map_err(|e| {
            warn!("Discord webhook failed: {}", e);
            Error::delivery(e.to_string())
        })?;

        info!(url = %payload.embed.url, "Notification delivered to Discord");
        debug!(content = %message.content, "Webhook content");
        Ok(())
    }
}
