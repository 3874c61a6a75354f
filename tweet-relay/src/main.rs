use anyhow::Context;
use tracing::info;

use tweet_relay::config::RelayConfig;
use tweet_relay::logging;
use tweet_relay::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env().context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.source.username,
        "Starting tweet-relay"
    );

    let container = ServiceContainer::initialize(config)
        .await
        .context("Startup failed")?;
    container.run().await?;

    info!("tweet-relay shut down");
    Ok(())
}
