//! Bibflow Server - Main entry point

use anyhow::Result;
use bibflow_common::logging::{init_logging, LogConfig};
use tracing::info;

use bibflow_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("bibflow-server".to_string())
        .filter_directives(
            "bibflow_server=debug,tower_http=debug,axum=trace,sqlx=info".to_string(),
        )
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting Bibflow Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await?;

    info!("Server shut down gracefully");

    Ok(())
}
