//! Core process state shared across the codebase.

mod signal;
mod state;

pub use signal::PrintSignal;
pub use state::{is_shutdown, register_shutdown, request_shutdown, setup_shutdown_handler};
