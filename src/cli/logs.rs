//! `fmon logs`: print the tail of the audit log, optionally following it.

use std::time::Duration;

use anyhow::{Context, Result};

use super::LogsArgs;
use crate::archive::{read_new, tail_lines};

const FOLLOW_INTERVAL: Duration = Duration::from_millis(500);

pub fn run(args: &LogsArgs) -> Result<()> {
    let path = &args.log_file;
    for line in tail_lines(path, args.lines)
        .with_context(|| format!("cannot read {}", path.display()))?
    {
        println!("{line}");
    }
    if !args.follow {
        return Ok(());
    }

    // Ctrl+C exits the process; no session is registered here
    let mut offset = std::fs::metadata(path)?.len();
    let ticker = crossbeam::channel::tick(FOLLOW_INTERVAL);
    loop {
        ticker.recv()?;
        match read_new(path, &mut offset) {
            Ok(lines) => lines.iter().for_each(|line| println!("{line}")),
            // Mid-rotation: the current file is briefly absent
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => offset = 0,
            Err(e) => return Err(e).with_context(|| format!("cannot read {}", path.display())),
        }
    }
}
