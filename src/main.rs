//! nexcache - offline-tolerant response cache for the Nexlayer API
//!
//! Inspects and maintains the local cache and the queue of operations
//! recorded while offline.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nexcache::cli::{self, Cli, Command};
use nexcache::{CacheManager, Config, HttpTransport};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so reports on stdout stay parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexcache=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = Config::from_env();
    debug!(
        "Configuration loaded: cache_dir={}, max_entries={}, max_size_bytes={}, ttl={}s",
        config.cache_dir.display(),
        config.max_entries,
        config.max_size_bytes,
        config.ttl
    );

    let transport = HttpTransport::new(&config.base_url, config.request_timeout_duration())
        .context("failed to build HTTP client")?
        .with_token(config.api_token.clone());

    let manager = CacheManager::open(&config, Arc::new(transport))
        .await
        .with_context(|| format!("failed to open cache at {}", config.cache_dir.display()))?;

    if cli.offline {
        manager.enter_strict_offline().await;
    }

    match cli.command {
        Command::Cache(command) => Ok(cli::cache::run(&manager, command, cli.json).await?),
    }
}
