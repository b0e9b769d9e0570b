//! Command-line interface.

mod args;
pub mod check;
pub mod logs;
pub mod search;
pub mod stats;
pub mod status;

pub use args::{CheckArgs, Cli, Commands, LogsArgs, SearchArgs, StatsArgs, StatusArgs, WatchArgs};
