use clap::Parser;

use console_core::cli::{self, Cli};
use console_core::config;

#[tokio::main]
async fn main() {
    // Load .env if present so base URLs and tenant flags can come from it.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config::config();
    tracing::debug!("console starting in {:?} mode", config.environment);

    let cli = Cli::parse();
    if let Err(err) = cli::run(cli).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
