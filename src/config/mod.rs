//! Monitor configuration from a `key=value` file plus CLI overrides.
//!
//! # Format
//!
//! ```text
//! # comment
//! recursive=true
//! extension=txt
//! extension=md
//! pattern_exclude=.*\.tmp$
//! pattern_alert=password
//! enable_checksum=true
//! enable_compression=true
//! max_file_size_mb=100
//! ```
//!
//! Pattern keys keep their relative order across all three kinds. Unknown keys
//! are warned about and ignored; malformed values are errors.

mod error;

pub use error::ConfigError;

use crate::cli::WatchArgs;
use crate::filter::{PatternRule, RuleAction, RuleSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "monitor.conf";
pub const DEFAULT_LOG_FILE: &str = "monitor.log";
pub const DEFAULT_STATS_FILE: &str = "monitor_stats.json";

const MB: u64 = 1024 * 1024;

/// Fully resolved monitor settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Path of the config file (reserved by the path filter)
    pub config_path: PathBuf,
    /// Descend into subdirectories and follow newly created ones
    pub recursive: bool,
    /// Extension allow-list (empty = all)
    pub extensions: Vec<String>,
    /// Ordered pattern rules
    pub patterns: Vec<PatternRule>,
    /// Gate modify notifications on content digests
    pub enable_checksum: bool,
    /// Gzip rotated log generations
    pub enable_compression: bool,
    /// Files above this size are reported without hashing (0 = no ceiling)
    pub max_file_size_mb: u64,
    /// Audit log path
    pub log_file: PathBuf,
    /// Persisted statistics document
    pub stats_file: PathBuf,
    /// Rotate the audit log beyond this size
    pub max_log_size_mb: u64,
    /// Retained rotated generations
    pub max_log_files: usize,
    /// Aggregator tick
    pub stats_interval_secs: u64,
    /// Optional control socket for status queries
    pub control_socket: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            recursive: true,
            extensions: Vec::new(),
            patterns: Vec::new(),
            enable_checksum: true,
            enable_compression: true,
            max_file_size_mb: 100,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            stats_file: PathBuf::from(DEFAULT_STATS_FILE),
            max_log_size_mb: 50,
            max_log_files: 10,
            stats_interval_secs: 5,
            control_socket: None,
        }
    }
}

impl MonitorConfig {
    /// Load from `path`. A missing file yields defaults (`Ok((config, false))`).
    pub fn load(path: &Path) -> Result<(Self, bool), ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self {
                    config_path: path.to_path_buf(),
                    ..Self::default()
                };
                return Ok((config, false));
            }
            Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
        };

        let mut config = Self::parse(&content)?;
        config.config_path = path.to_path_buf();
        Ok((config, true))
    }

    /// Parse `key=value` content on top of the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    text: line.to_owned(),
                });
            };
            let key = key.trim();
            let value = value.trim();

            config.apply(line_no, key, value)?;
        }

        Ok(config)
    }

    fn apply(&mut self, line: usize, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            line,
            key: key.to_owned(),
            value: value.to_owned(),
        };

        if let Some(action) = RuleAction::from_key(key) {
            let rule =
                PatternRule::new(action, value).map_err(|source| ConfigError::InvalidPattern {
                    line,
                    pattern: value.to_owned(),
                    source,
                })?;
            self.patterns.push(rule);
            return Ok(());
        }

        match key {
            "recursive" => self.recursive = parse_bool(value).ok_or_else(invalid)?,
            "extension" => {
                let ext = value.trim_start_matches('.');
                if ext.is_empty() {
                    return Err(invalid());
                }
                self.extensions.push(ext.to_owned());
            }
            "enable_checksum" => self.enable_checksum = parse_bool(value).ok_or_else(invalid)?,
            "enable_compression" => {
                self.enable_compression = parse_bool(value).ok_or_else(invalid)?;
            }
            "max_file_size_mb" => self.max_file_size_mb = value.parse().map_err(|_| invalid())?,
            "log_file" => self.log_file = PathBuf::from(value),
            "stats_file" => self.stats_file = PathBuf::from(value),
            "max_log_size_mb" => {
                self.max_log_size_mb = value.parse().map_err(|_| invalid())?;
                if self.max_log_size_mb == 0 {
                    return Err(invalid());
                }
            }
            "max_log_files" => {
                self.max_log_files = value.parse().map_err(|_| invalid())?;
                if self.max_log_files == 0 {
                    return Err(invalid());
                }
            }
            "stats_interval_secs" => {
                self.stats_interval_secs = value.parse().map_err(|_| invalid())?;
                if self.stats_interval_secs == 0 {
                    return Err(invalid());
                }
            }
            "control_socket" => {
                self.control_socket = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            _ => crate::log!("config"; "line {}: unknown key `{}` ignored", line, key),
        }
        Ok(())
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, args: &WatchArgs) {
        if let Some(recursive) = args.recursive {
            self.recursive = recursive;
        }
        if let Some(checksum) = args.checksum {
            self.enable_checksum = checksum;
        }
        if let Some(compress) = args.compress {
            self.enable_compression = compress;
        }
        if let Some(path) = &args.log_file {
            self.log_file = path.clone();
        }
        if let Some(path) = &args.stats_file {
            self.stats_file = path.clone();
        }
        if let Some(path) = &args.socket {
            self.control_socket = Some(path.clone());
        }
        if let Some(secs) = args.stats_interval
            && secs > 0
        {
            self.stats_interval_secs = secs;
        }
    }

    /// Extension allow-list plus pattern rules, as the path filter consumes them.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::new(self.extensions.clone(), self.patterns.clone())
    }

    /// Hashing ceiling in bytes; `None` when disabled.
    pub fn hash_ceiling_bytes(&self) -> Option<u64> {
        (self.max_file_size_mb > 0).then(|| self.max_file_size_mb.saturating_mul(MB))
    }

    pub fn max_log_bytes(&self) -> u64 {
        self.max_log_size_mb.saturating_mul(MB)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
