//! Service container.
//!
//! Builds every component in startup order, then owns the running relay
//! until shutdown.

use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{AppState, HealthServer};
use crate::config::{RelayConfig, SinkConfig};
use crate::logging;
use crate::metrics::RelayHealth;
use crate::monitor::RelayService;
use crate::notification::{
    DiscordBot, DiscordWebhook, DiscordWebhookConfig, MentionResolver, MentionTarget,
    RoleDirectory,
};
use crate::scheduler::{IntervalTicker, Scheduler};
use crate::source::{FeedSource, TwitterSource};
use crate::utils::http_client::build_http_client;
use crate::{Error, Result};

/// The production relay.
pub type Relay = RelayService<TwitterSource, DiscordWebhook>;

/// Holds the running services.
pub struct ServiceContainer {
    config: RelayConfig,
    /// Shared health state.
    pub health: Arc<RelayHealth>,
    /// The relay driven by the scheduler.
    pub relay: Arc<Relay>,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Build all services. Fatal errors (bad configuration, rejected
    /// credentials) are returned; anything else is logged.
    pub async fn initialize(config: RelayConfig) -> Result<Self> {
        info!("Initializing service container");

        let http = build_http_client(config.http_timeout)?;

        let source = TwitterSource::new(http.clone(), &config.source)?;
        match source.verify_account().await {
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => warn!(error = %e, "Could not verify source account; continuing"),
        }

        let health = Arc::new(RelayHealth::new(source.name(), config.check_interval));
        let mention = resolve_mention(&http, &config.sink, &health).await?;

        let deliverer = DiscordWebhook::new(
            http,
            DiscordWebhookConfig {
                webhook_url: config.sink.webhook_url.clone(),
                username: config.sink.webhook_username.clone(),
                avatar_url: config.sink.webhook_avatar_url.clone(),
            },
        );
        let relay = Arc::new(RelayService::new(
            source,
            deliverer,
            mention,
            health.clone(),
        ));

        info!(
            source = relay.health().source(),
            interval_secs = config.check_interval.as_secs(),
            mention = ?relay.mention(),
            "Service container initialized"
        );

        Ok(Self {
            config,
            health,
            relay,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Run until Ctrl-C / SIGTERM or until the token is cancelled.
    pub async fn run(self) -> Result<()> {
        let token = self.cancellation_token.clone();

        if let Some(log_dir) = &self.config.log_dir {
            logging::start_retention_cleanup(log_dir, token.child_token());
        }

        let server = HealthServer::new(
            self.config.health.clone(),
            AppState::new(self.health.clone()),
            token.child_token(),
        );
        let server_task = tokio::spawn(async move {
            // The relay keeps running without its health endpoint.
            if let Err(e) = server.run().await {
                error!(error = %e, "Health server failed");
            }
        });

        {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown_signal() => token.cancel(),
                    _ = token.cancelled() => {}
                }
            });
        }

        let scheduler = Scheduler::new(
            self.relay.clone(),
            IntervalTicker::new(self.config.check_interval),
            token.clone(),
        );
        scheduler.run().await;

        token.cancel();
        if let Err(e) = server_task.await {
            warn!(error = %e, "Health server task did not finish cleanly");
        }

        let state = self.relay.detection_state().await;
        info!(
            last_delivered_id = ?state.last_delivered_id.as_ref().map(|id| id.as_str()),
            "Relay stopped"
        );
        Ok(())
    }
}

/// Establish the destination session when a role lookup is needed, then
/// resolve the mention target.
async fn resolve_mention(
    http: &Client,
    sink: &SinkConfig,
    health: &RelayHealth,
) -> Result<MentionTarget> {
    let role_name = sink.mention_role_name.as_deref();

    if !sink.needs_role_lookup() {
        health.set_destination_ready(true);
        return Ok(MentionResolver::new(None)
            .resolve(role_name, sink.mentions_enabled)
            .await);
    }

    let token = sink
        .bot_token
        .as_deref()
        .ok_or_else(|| Error::config("DISCORD_BOT_TOKEN is required for role mentions"))?;
    let bot = DiscordBot::connect(http.clone(), &sink.api_base_url, token).await?;
    health.set_destination_ready(true);

    let directory: &dyn RoleDirectory = &bot;
    Ok(MentionResolver::new(Some(directory))
        .resolve(role_name, sink.mentions_enabled)
        .await)
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
