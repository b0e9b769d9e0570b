//! `fmon check`: dry-run the configured filter against file names.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use super::CheckArgs;
use crate::config::MonitorConfig;
use crate::filter::should_monitor;

pub fn run(args: &CheckArgs) -> Result<()> {
    let (config, found) = MonitorConfig::load(&args.config)
        .with_context(|| format!("invalid config `{}`", args.config.display()))?;
    if !found {
        crate::log!("config"; "{} not found, using defaults", args.config.display());
    }

    let rules = config.rule_set();
    for name in &args.names {
        if should_monitor(name, &rules) {
            println!("{}  {}", "monitor".green(), name);
        } else {
            println!("{}     {}", "skip".dimmed(), name);
        }
    }
    Ok(())
}
