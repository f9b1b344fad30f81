//! CLI module for chanpool
//!
//! Provides the command-line interface for the channel pool server.

pub mod serve;

use clap::{Parser, Subcommand};

/// Channel pool manager for an OpenAI-compatible chat-completion proxy
#[derive(Parser, Debug)]
#[command(name = "chanpool")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    CHANPOOL_HOST                       Bind address (default: 0.0.0.0)
    CHANPOOL_PORT                       Listen port (default: 3000)
    CHANPOOL_LOG_LEVEL                  Log level (default: info)
    CHANPOOL_LOG_DIR                    Log directory (default: ~/.chanpool/logs)
    CHANPOOL_DATABASE_URL               Database URL (default: sqlite:~/.chanpool/chanpool.db)
    CHANPOOL_PROBE_TIMEOUT_SECS         Probe request timeout (default: 20)
    CHANPOOL_SWEEP_INTERVAL_SECS        Scheduled sweep interval, 0 disables (default: 0)
    CHANPOOL_CHANNEL_DISABLE_THRESHOLD  Latency threshold in seconds, 0 disables (default: 0)
    CHANPOOL_OPERATOR_ADDRESS           Operator notification address
    CHANPOOL_NOTIFY_WEBHOOK_URL         Webhook for operator notifications (log only if unset)
    CHANPOOL_ROOT_ACCESS_TOKEN          Access token of the root user created on first run
    CHANPOOL_ROOT_EMAIL                 Email of the root user created on first run
    CHANPOOL_ROOT_RELAY_KEY             Relay key registered for the root user on first run
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the channel pool server
    Serve(serve::ServeArgs),
}
