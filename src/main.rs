//! fmon - recursive directory monitor built on inotify.

mod archive;
mod cli;
mod config;
mod control;
mod core;
mod dispatch;
mod filter;
mod freshness;
mod logger;
mod monitor;
mod stats;
mod watch;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands, WatchArgs};
use config::MonitorConfig;
use monitor::MonitorSession;

fn main() {
    if let Err(e) = run() {
        log!("error"; "{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Watch { args } => watch(args),
        Commands::Status { args } => cli::status::run(args),
        Commands::Check { args } => cli::check::run(args),
        Commands::Logs { args } => cli::logs::run(args),
        Commands::Search { args } => cli::search::run(args),
        Commands::Stats { args } => cli::stats::run(args),
    }
}

// =============================================================================
// Watch Command
// =============================================================================

fn watch(args: &WatchArgs) -> Result<()> {
    let (mut config, found) = MonitorConfig::load(&args.config)
        .with_context(|| format!("invalid config `{}`", args.config.display()))?;
    config.apply_cli(args);

    if found {
        log!(
            "config";
            "loaded {}: recursive={}, extensions={}, patterns={}",
            args.config.display(),
            config.recursive,
            config.extensions.len(),
            config.patterns.len()
        );
    } else {
        log!("config"; "{} not found, using defaults", args.config.display());
    }
    for rule in &config.patterns {
        debug!("config"; "{} /{}/", rule.action().label(), rule.pattern());
    }

    let session = MonitorSession::start(&args.root, config)?;
    log!("watch"; "monitoring {} (Ctrl+C to stop)", session.root().display());

    let (tx, rx) = crossbeam::channel::bounded(1);
    core::register_shutdown(tx);

    let snapshot = session.run(rx)?;
    snapshot.to_block().print();
    Ok(())
}
