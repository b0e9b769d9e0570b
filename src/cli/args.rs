//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// fmon directory monitor CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch a directory tree until interrupted
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: WatchArgs,
    },

    /// Query a running monitor over its control socket
    #[command(visible_alias = "s")]
    Status {
        #[command(flatten)]
        args: StatusArgs,
    },

    /// Show which file names the configured filter would monitor
    #[command(visible_alias = "c")]
    Check {
        #[command(flatten)]
        args: CheckArgs,
    },

    /// Print the tail of the audit log, optionally following it
    #[command(visible_alias = "l")]
    Logs {
        #[command(flatten)]
        args: LogsArgs,
    },

    /// Search the audit log and its rotated generations
    Search {
        #[command(flatten)]
        args: SearchArgs,
    },

    /// Print the last persisted statistics document
    Stats {
        #[command(flatten)]
        args: StatsArgs,
    },
}

/// Arguments for the `watch` command.
#[derive(clap::Args, Debug, Clone)]
pub struct WatchArgs {
    /// Root directory to monitor
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub root: PathBuf,

    /// Config file path (key=value lines)
    #[arg(short = 'C', long, default_value = crate::config::DEFAULT_CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Watch subdirectories (overrides `recursive=`)
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub recursive: Option<bool>,

    /// Gate modify events on content digests (overrides `enable_checksum=`)
    #[arg(short = 'k', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub checksum: Option<bool>,

    /// Gzip rotated log generations (overrides `enable_compression=`)
    #[arg(short = 'z', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub compress: Option<bool>,

    /// Audit log path
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Statistics document path
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub stats_file: Option<PathBuf>,

    /// Control socket for status queries
    #[arg(short = 'S', long, value_hint = clap::ValueHint::FilePath)]
    pub socket: Option<PathBuf>,

    /// Seconds between statistics snapshots
    #[arg(short = 'i', long)]
    pub stats_interval: Option<u64>,
}

/// Arguments for the `status` command.
#[derive(clap::Args, Debug, Clone)]
pub struct StatusArgs {
    /// Control socket of the running monitor
    #[arg(short = 'S', long, value_hint = clap::ValueHint::FilePath)]
    pub socket: PathBuf,

    /// Command to send (ping, status, snapshot)
    #[arg(default_value = "status")]
    pub command: String,

    /// Pretty-print the JSON response
    #[arg(short, long)]
    pub pretty: bool,
}

/// Arguments for the `check` command.
#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    /// File names to evaluate
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Config file path (key=value lines)
    #[arg(short = 'C', long, default_value = crate::config::DEFAULT_CONFIG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,
}

/// Arguments for the `logs` command.
#[derive(clap::Args, Debug, Clone)]
pub struct LogsArgs {
    /// Audit log path
    #[arg(short, long, default_value = crate::config::DEFAULT_LOG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub log_file: PathBuf,

    /// Number of trailing lines to print
    #[arg(short = 'n', long, default_value_t = 20)]
    pub lines: usize,

    /// Keep printing lines as they are appended
    #[arg(short, long)]
    pub follow: bool,
}

/// Arguments for the `search` command.
#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Regular expression matched against each log line
    pub query: String,

    /// Audit log path; rotated generations beside it are searched too
    #[arg(short, long, default_value = crate::config::DEFAULT_LOG_FILE, value_hint = clap::ValueHint::FilePath)]
    pub log_file: PathBuf,

    /// Match case-insensitively
    #[arg(short, long)]
    pub ignore_case: bool,
}

/// Arguments for the `stats` command.
#[derive(clap::Args, Debug, Clone)]
pub struct StatsArgs {
    /// Statistics document path
    #[arg(short, long, default_value = crate::config::DEFAULT_STATS_FILE, value_hint = clap::ValueHint::FilePath)]
    pub stats_file: PathBuf,

    /// Print the raw JSON document
    #[arg(long)]
    pub json: bool,
}
