//! Path filter: decides whether a file name is worth monitoring.
//!
//! ```text
//! file name → self-exclusion → extension allow-list → ordered pattern rules
//! ```
//!
//! Self-exclusion runs first so the monitor never reports its own log, config
//! or stats writes. The extension layer runs before the pattern layer so that
//! a name rejected by extension never triggers an alert side effect.

mod rules;

pub use rules::{PatternRule, RuleAction};

use std::path::Path;

/// Editor/transient extensions that are never reported.
const TRANSIENT_EXTENSIONS: &[&str] = &["tmp", "swp", "swo", "swx", "bak", "bck", "backup"];

/// Extension allow-list plus ordered pattern rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    extensions: Vec<String>,
    rules: Vec<PatternRule>,
}

/// Why a name was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The monitor's own log/config/stats file.
    Reserved,
    /// Temporary or swap file.
    Transient,
    /// Extension not in the allow-list.
    Extension,
    /// An exclude rule matched first.
    Excluded,
}

/// Outcome of evaluating a file name.
#[derive(Debug)]
pub enum Verdict<'a> {
    /// Accepted; `alerts` lists every alert rule matched on the way.
    Accept { alerts: Vec<&'a PatternRule> },
    Reject(RejectReason),
}

impl Verdict<'_> {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept { .. })
    }
}

impl RuleSet {
    pub fn new(extensions: Vec<String>, rules: Vec<PatternRule>) -> Self {
        Self { extensions, rules }
    }

    /// Pure evaluation of both layers. No logging.
    pub fn evaluate<'a>(&'a self, filename: &str) -> Verdict<'a> {
        if !self.extension_allowed(filename) {
            return Verdict::Reject(RejectReason::Extension);
        }
        self.evaluate_rules(filename)
    }

    /// Pattern layer only.
    pub fn evaluate_rules<'a>(&'a self, filename: &str) -> Verdict<'a> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            if !rule.is_match(filename) {
                continue;
            }
            match rule.action() {
                RuleAction::Exclude => return Verdict::Reject(RejectReason::Excluded),
                RuleAction::Include => return Verdict::Accept { alerts },
                RuleAction::Alert => alerts.push(rule),
            }
        }
        Verdict::Accept { alerts }
    }

    /// Empty list allows all; otherwise the text after the last `.` must match
    /// a listed value exactly (case-sensitive). No `.` means no extension.
    fn extension_allowed(&self, filename: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some((_, ext)) = filename.rsplit_once('.') else {
            return false;
        };
        self.extensions.iter().any(|allowed| allowed == ext)
    }
}

/// Decide monitor-worthiness of `filename` under `rules`, logging alert matches.
pub fn should_monitor(filename: &str, rules: &RuleSet) -> bool {
    match rules.evaluate(filename) {
        Verdict::Accept { alerts } => {
            for rule in alerts {
                crate::log!("alert"; "pattern '{}' matched: {}", rule.pattern(), filename);
            }
            true
        }
        Verdict::Reject(_) => false,
    }
}

/// Rule set plus the monitor's own reserved file names.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    rules: RuleSet,
    /// Exact file names that are always rejected.
    reserved: Vec<String>,
    /// Names whose `<reserved>.<suffix>` variants are rejected too (log generations).
    reserved_stems: Vec<String>,
}

impl PathFilter {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            reserved: Vec::new(),
            reserved_stems: Vec::new(),
        }
    }

    /// Reserve the file name of `path`.
    pub fn reserve(mut self, path: &Path) -> Self {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.reserved.push(name.to_owned());
        }
        self
    }

    /// Reserve the file name of `path` and every `<name>.<suffix>` sibling.
    pub fn reserve_with_generations(mut self, path: &Path) -> Self {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            self.reserved.push(name.to_owned());
            self.reserved_stems.push(format!("{name}."));
        }
        self
    }

    /// Full check: self-exclusion, then the rule set.
    pub fn check(&self, filename: &str) -> Verdict<'_> {
        if self.is_reserved(filename) {
            return Verdict::Reject(RejectReason::Reserved);
        }
        if is_transient(filename) {
            return Verdict::Reject(RejectReason::Transient);
        }
        self.rules.evaluate(filename)
    }

    /// Check for a directory name. The extension allow-list describes files,
    /// so only self-exclusion and the pattern rules apply.
    pub fn check_directory(&self, name: &str) -> Verdict<'_> {
        if self.is_reserved(name) {
            return Verdict::Reject(RejectReason::Reserved);
        }
        self.rules.evaluate_rules(name)
    }

    fn is_reserved(&self, filename: &str) -> bool {
        self.reserved.iter().any(|r| r == filename)
            || self
                .reserved_stems
                .iter()
                .any(|stem| filename.starts_with(stem.as_str()))
    }
}

/// Temp/swap/backup artifacts (editor noise).
fn is_transient(filename: &str) -> bool {
    if filename.ends_with('~') || filename.starts_with(".#") {
        return true;
    }
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| TRANSIENT_EXTENSIONS.contains(&ext))
}
