//! Relay configuration loaded from environment variables.
//!
//! A `.env` file is honoured through `dotenvy` before the environment is
//! read. Parsing is done against a lookup closure so it can be tested
//! without touching the process environment.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::{Error, Result};

/// Default polling period (30 minutes).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30 * 60;
pub const DEFAULT_SCAN_BATCH_SIZE: u32 = 10;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_DISCORD_API_BASE_URL: &str = "https://discord.com/api/v10";

/// Scan filters applied to the source query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFilter {
    pub exclude_reposts: bool,
    pub exclude_replies: bool,
    pub exclude_quotes: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self {
            exclude_reposts: true,
            exclude_replies: true,
            exclude_quotes: true,
        }
    }
}

/// Source feed settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub username: String,
    pub bearer_token: String,
    pub api_base_url: String,
    pub filter: ScanFilter,
    pub batch_size: u32,
}

/// Destination settings.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub webhook_url: String,
    pub bot_token: Option<String>,
    pub api_base_url: String,
    /// Role to mention; `None` skips straight to the broadcast fallback.
    pub mention_role_name: Option<String>,
    pub mentions_enabled: bool,
    pub webhook_username: Option<String>,
    pub webhook_avatar_url: Option<String>,
}

impl SinkConfig {
    /// Whether the role lookup needs a bot session.
    pub fn needs_role_lookup(&self) -> bool {
        self.mentions_enabled && self.mention_role_name.is_some()
    }
}

/// Health endpoint settings.
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Complete relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub check_interval: Duration,
    pub http_timeout: Duration,
    pub health: HealthServerConfig,
    pub log_dir: Option<PathBuf>,
}

impl RelayConfig {
    /// Load from the process environment (after reading `.env` if present).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(lookup);

        let required = ["TWITTER_BEARER_TOKEN", "TWITTER_USERNAME", "DISCORD_WEBHOOK_URL"];
        let missing: Vec<&str> = required
            .into_iter()
            .filter(|key| env.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let username = env
            .get("TWITTER_USERNAME")
            .unwrap_or_default()
            .trim_start_matches('@')
            .to_string();
        if username.is_empty() {
            return Err(Error::config("TWITTER_USERNAME must not be empty"));
        }

        let webhook_url = env.get("DISCORD_WEBHOOK_URL").unwrap_or_default();
        validate_webhook_url(&webhook_url)?;

        let batch_size = env.parse_or("SCAN_BATCH_SIZE", DEFAULT_SCAN_BATCH_SIZE)?;
        if !(10..=100).contains(&batch_size) {
            return Err(Error::config(format!(
                "SCAN_BATCH_SIZE must be between 10 and 100, got {batch_size}"
            )));
        }

        let check_interval_secs =
            env.parse_or("CHECK_INTERVAL_SECS", DEFAULT_CHECK_INTERVAL_SECS)?;
        if check_interval_secs == 0 {
            return Err(Error::config("CHECK_INTERVAL_SECS must be greater than 0"));
        }

        let http_timeout_secs = env.parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;

        let sink = SinkConfig {
            webhook_url,
            bot_token: env.get("DISCORD_BOT_TOKEN"),
            api_base_url: env
                .get("DISCORD_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DISCORD_API_BASE_URL.to_string()),
            mention_role_name: env.get("MENTION_ROLE_NAME"),
            mentions_enabled: env.bool_or("MENTIONS_ENABLED", true)?,
            webhook_username: env.get("WEBHOOK_USERNAME"),
            webhook_avatar_url: env.get("WEBHOOK_AVATAR_URL"),
        };
        if sink.needs_role_lookup() && sink.bot_token.is_none() {
            return Err(Error::config(
                "DISCORD_BOT_TOKEN is required when MENTION_ROLE_NAME is set",
            ));
        }

        Ok(Self {
            source: SourceConfig {
                username,
                bearer_token: env.get("TWITTER_BEARER_TOKEN").unwrap_or_default(),
                api_base_url: env
                    .get("TWITTER_API_BASE_URL")
                    .unwrap_or_else(|| twitter_api::DEFAULT_BASE_URL.to_string()),
                filter: ScanFilter {
                    exclude_reposts: env.bool_or("FILTER_RETWEETS", true)?,
                    exclude_replies: env.bool_or("FILTER_REPLIES", true)?,
                    exclude_quotes: env.bool_or("FILTER_QUOTES", true)?,
                },
                batch_size,
            },
            sink,
            check_interval: Duration::from_secs(check_interval_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            health: HealthServerConfig {
                bind_address: env
                    .get("API_BIND_ADDRESS")
                    .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
                port: env.parse_or("PORT", DEFAULT_PORT)?,
            },
            log_dir: env.get("LOG_DIR").map(PathBuf::from),
        })
    }
}

/// Trimmed, non-empty lookups plus typed parsing helpers.
struct Lookup<F>(F);

impl<F> Lookup<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| Error::config(format!("invalid {key}={raw:?}: {e}"))),
            None => Ok(default),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| Error::config(format!("invalid boolean {key}={raw:?}"))),
            None => Ok(default),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate_webhook_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| Error::config(format!("invalid DISCORD_WEBHOOK_URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || !url.path().contains("/api/webhooks/") {
        return Err(Error::config(
            "invalid DISCORD_WEBHOOK_URL format: expected .../api/webhooks/<id>/<token>",
        ));
    }
    Ok(())
}
