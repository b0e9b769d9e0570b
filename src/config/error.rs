//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("line {line}: expected `key=value`, found `{text}`")]
    Syntax { line: usize, text: String },

    #[error("line {line}: invalid value `{value}` for `{key}`")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },

    #[error("line {line}: invalid pattern `{pattern}`")]
    InvalidPattern {
        line: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
