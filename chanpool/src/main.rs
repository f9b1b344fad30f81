//! Channel pool Server Entry Point

use anyhow::Context;
use chanpool::cli::{Cli, Commands};
use chanpool::config::PoolConfig;
use chanpool::shutdown::ShutdownController;
use chanpool::{bootstrap, logging, server};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init() {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let mut config = PoolConfig::from_env();
    match cli.command {
        Some(Commands::Serve(args)) => args.apply(&mut config),
        None => {
            // No subcommand - default to serve with environment settings
        }
    }

    if let Err(e) = run_server(config).await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: PoolConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr();
    let shutdown = ShutdownController::default();

    let state = bootstrap::initialize(config, shutdown)
        .await
        .context("Failed to initialize server")?;

    server::run(state, &bind_addr)
        .await
        .with_context(|| format!("Server error on {}", bind_addr))
}
