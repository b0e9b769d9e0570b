//! `fmon search`: grep the audit log across rotated generations.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use regex::RegexBuilder;

use super::SearchArgs;
use crate::archive::search;

pub fn run(args: &SearchArgs) -> Result<()> {
    let pattern = RegexBuilder::new(&args.query)
        .case_insensitive(args.ignore_case)
        .build()
        .with_context(|| format!("invalid query `{}`", args.query))?;

    let matches = search(&args.log_file, &pattern)
        .with_context(|| format!("cannot search {}", args.log_file.display()))?;

    for hit in &matches {
        let file = hit
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("{}  {}", file.dimmed(), hit.line);
    }
    crate::log!("search"; "{} match(es)", matches.len());
    Ok(())
}
