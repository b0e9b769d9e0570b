//! `fmon stats`: show the last statistics document a monitor persisted.

use anyhow::{Context, Result};

use super::StatsArgs;
use crate::stats::StatsSnapshot;

pub fn run(args: &StatsArgs) -> Result<()> {
    let snapshot = StatsSnapshot::load(&args.stats_file)
        .with_context(|| format!("cannot load {}", args.stats_file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        crate::log!("stats"; "snapshot taken {}", snapshot.timestamp);
        snapshot.to_block().print();
    }
    Ok(())
}
