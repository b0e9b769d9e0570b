//! One JSON request per connection, one JSON response back.
//!
//! ```text
//! → {"command": "status", "data": {}}
//! ← {"success": true, "data": {...snapshot...}}
//! ```
//!
//! Failure responses carry a fixed short reason, never internal error text.

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::stats::StatsSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub data: Value,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            data: json!({}),
        }
    }
}

/// What request handling may read or trigger.
#[derive(Clone)]
pub struct ControlContext {
    pub latest: Arc<Mutex<Option<StatsSnapshot>>>,
    pub print_trigger: Sender<()>,
}

pub fn handle_line(line: &str, ctx: &ControlContext) -> Value {
    match serde_json::from_str::<Request>(line.trim()) {
        Ok(request) => handle(&request, ctx),
        Err(_) => failure("invalid request"),
    }
}

pub fn handle(request: &Request, ctx: &ControlContext) -> Value {
    match request.command.as_str() {
        "ping" => json!({ "success": true, "message": "pong" }),
        "status" => match ctx.latest.lock().as_ref() {
            Some(snapshot) => json!({ "success": true, "data": snapshot }),
            None => failure("not ready"),
        },
        "snapshot" => {
            if ctx.print_trigger.send(()).is_ok() {
                json!({ "success": true, "message": "snapshot requested" })
            } else {
                failure("unavailable")
            }
        }
        _ => failure("unknown command"),
    }
}

fn failure(reason: &str) -> Value {
    json!({ "success": false, "error": reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel;

    fn ctx() -> (ControlContext, channel::Receiver<()>) {
        let (tx, rx) = channel::unbounded();
        let ctx = ControlContext {
            latest: Arc::new(Mutex::new(None)),
            print_trigger: tx,
        };
        (ctx, rx)
    }

    #[test]
    fn test_ping() {
        let (ctx, _rx) = ctx();
        let response = handle_line(r#"{"command":"ping"}"#, &ctx);
        assert_eq!(response["success"], true);
        assert_eq!(response["message"], "pong");
    }

    #[test]
    fn test_status_before_and_after_first_snapshot() {
        let (ctx, _rx) = ctx();
        assert_eq!(handle(&Request::new("status"), &ctx)["success"], false);

        *ctx.latest.lock() = Some(StatsSnapshot {
            events_total: 7,
            ..Default::default()
        });
        let response = handle(&Request::new("status"), &ctx);
        assert_eq!(response["success"], true);
        assert_eq!(response["data"]["events_total"], 7);
    }

    #[test]
    fn test_snapshot_triggers_print() {
        let (ctx, rx) = ctx();
        let response = handle(&Request::new("snapshot"), &ctx);
        assert_eq!(response["success"], true);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_failures_are_opaque() {
        let (ctx, rx) = ctx();
        let response = handle_line("not json", &ctx);
        assert_eq!(response, json!({ "success": false, "error": "invalid request" }));

        let response = handle(&Request::new("reboot"), &ctx);
        assert_eq!(response, json!({ "success": false, "error": "unknown command" }));

        drop(rx);
        let response = handle(&Request::new("snapshot"), &ctx);
        assert_eq!(response, json!({ "success": false, "error": "unavailable" }));
    }
}
