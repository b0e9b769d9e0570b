//! Console logging with colored module prefixes.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro gated on the global verbose flag
//! - `StatsBlock` for the multi-line stats dump requested out-of-band
//!
//! # Example
//!
//! ```ignore
//! log!("watch"; "added {} (handle {})", path.display(), handle);
//! debug!("event"; "raw mask {:?}", mask);
//! ```
//!
//! The audit log written by [`crate::archive`] is separate; console output is
//! for the operator watching the terminal.

use crossterm::{
    execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stdout},
    sync::atomic::{AtomicBool, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Serializes multi-line writes so concurrent threads don't interleave.
static STDOUT_GUARD: Mutex<()> = Mutex::new(());

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let _guard = STDOUT_GUARD.lock();
    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "watch" => prefix.bright_green().bold().to_string(),
        "event" => prefix.bright_blue().bold().to_string(),
        "stats" => prefix.bright_cyan().bold().to_string(),
        "alert" => prefix.bright_magenta().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warn" | "overflow" => prefix.red().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Stats Block (multi-line key/value dump)
// ============================================================================

/// Multi-line aligned dump used for the out-of-band stats print.
///
/// ```ignore
/// let mut block = StatsBlock::new("monitor stats");
/// block.row("events", 42);
/// block.print();
/// ```
pub struct StatsBlock {
    title: &'static str,
    rows: Vec<(&'static str, String)>,
}

impl StatsBlock {
    pub const fn new(title: &'static str) -> Self {
        Self {
            title,
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, key: &'static str, value: impl std::fmt::Display) -> &mut Self {
        self.rows.push((key, value.to_string()));
        self
    }

    #[cfg(test)]
    pub fn render_plain(&self) -> String {
        let width = self.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut out = format!("=== {} ===\n", self.title);
        for (key, value) in &self.rows {
            out.push_str(&format!("{key:<width$}  {value}\n"));
        }
        out
    }

    pub fn print(&self) {
        let width = self.rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let _guard = STDOUT_GUARD.lock();
        let mut stdout = stdout().lock();
        writeln!(stdout, "{}", format!("=== {} ===", self.title).bold()).ok();
        for (key, value) in &self.rows {
            writeln!(stdout, "{}  {}", format!("{key:<width$}").dimmed(), value).ok();
        }
        stdout.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_toggle() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_stats_block_alignment() {
        let mut block = StatsBlock::new("stats");
        block.row("events", 3).row("watches_active", 12);
        let rendered = block.render_plain();

        assert!(rendered.starts_with("=== stats ===\n"));
        assert!(rendered.contains("events          3\n"));
        assert!(rendered.contains("watches_active  12\n"));
    }

    #[test]
    fn test_stats_block_empty() {
        let block = StatsBlock::new("empty");
        assert_eq!(block.render_plain(), "=== empty ===\n");
    }
}
