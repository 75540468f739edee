use anyhow::Result;
use portfolio_api::config::Config;
use portfolio_api::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| e.exit());

    let default_filter = if config.debug {
        "portfolio_api=debug,tower_http=debug".to_string()
    } else {
        format!("portfolio_api={},tower_http=debug", config.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting {}", config.app_name);
    tracing::info!(
        "Configuration: bind_addr={}, download_limit={}/{}s",
        config.bind_addr,
        config.download_limit,
        config.download_window_secs
    );

    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
