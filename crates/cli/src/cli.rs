//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Broadcast - deliver one message to many targets at once
#[derive(Parser, Debug)]
#[command(
    name = "broadcast",
    author,
    version,
    about = "Broadcast a message to one or more targets",
    long_about = "Broadcast a message (title, body, optional images) to every target \n\
                  addressed by a URI such as log://, file:///var/spool/broadcast or \n\
                  udp://127.0.0.1:9000, and print the combined delivery identifier."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BROADCAST_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BROADCAST_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Broadcast a message to every configured target
    Send(SendArgs),

    /// List the URI schemes known to the registry
    Schemes(SchemesArgs),

    /// Validate configuration file without sending anything
    Validate(ValidateArgs),
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    /// Target URI; repeat the flag or pass a comma-separated list
    #[arg(
        short,
        long = "broadcaster",
        value_delimiter = ',',
        env = "BROADCAST_BROADCASTERS"
    )]
    pub broadcasters: Vec<String>,

    /// Message title
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Message body
    #[arg(long, default_value = "")]
    pub body: String,

    /// Image to attach (repeatable)
    #[arg(short, long = "image")]
    pub images: Vec<PathBuf>,

    /// Configuration file (TOML or JSON); flags take precedence
    #[arg(short, long, env = "BROADCAST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Deliver to one target at a time
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of targets delivered to at once
    #[arg(long, env = "BROADCAST_MAX_CONCURRENCY")]
    pub max_concurrency: Option<usize>,

    /// Cancel the broadcast after this many seconds
    #[arg(long, env = "BROADCAST_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Print the delivery identifier as JSON
    #[arg(long)]
    pub json: bool,

    /// Write dispatch metrics in Prometheus text format to stderr
    #[arg(long)]
    pub print_metrics: bool,
}

/// Arguments for the `schemes` command
#[derive(Parser, Debug)]
pub struct SchemesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "broadcast.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
