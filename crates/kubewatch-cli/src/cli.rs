//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// kubewatch - Kubernetes resource change notifications.
#[derive(Parser, Debug, Clone)]
#[command(name = "kubewatch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of `~/.kubewatch.yaml`.
    #[arg(short, long, global = true, env = "KUBEWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Log output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Read resource changes from stdin and notify every configured channel.
    Run(RunArgs),

    /// Inspect the config file.
    Config {
        /// Config subcommand to execute.
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Arguments for the run command.
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Credential override, highest precedence (e.g. `slack.token=xoxb-...`).
    #[arg(short, long = "set", value_name = "CHANNEL.FIELD=VALUE")]
    pub set: Vec<String>,

    /// Upper bound in seconds for one notification.
    #[arg(long, default_value_t = 5)]
    pub timeout_secs: u64,

    /// Log notifications instead of sending them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Print the config file, creating it if absent.
    View,
    /// Print the config file location.
    Path,
}
