use anyhow::Context;
use tokio::io::BufReader;

use betastack::cli;
use betastack::config::StoreConfig;
use betastack::store::CardStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = StoreConfig::from_env().context("Invalid configuration")?;

    // Logs go to stderr so stdout carries only command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    eprintln!("📦 BetaStack v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.location);
    eprintln!("   Type 'help' for commands, 'quit' to exit.\n");

    let store = CardStore::open(&config)
        .await
        .with_context(|| format!("Failed to initialize card store at {}", config.location))?;

    cli::run(&store, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    Ok(())
}
