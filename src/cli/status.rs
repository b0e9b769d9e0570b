//! `fmon status`: query a running monitor over its control socket.

use anyhow::{Context, Result, bail};

use super::StatusArgs;
use crate::control::{Request, send_request};

/// Send the request, print the response, fail when the monitor reports failure.
pub fn run(args: &StatusArgs) -> Result<()> {
    let request = Request::new(args.command.as_str());
    let response = send_request(&args.socket, &request)
        .with_context(|| format!("cannot reach monitor at {}", args.socket.display()))?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        response.to_string()
    };
    println!("{rendered}");

    if response["success"] != true {
        bail!("monitor rejected `{}`", args.command);
    }
    Ok(())
}
