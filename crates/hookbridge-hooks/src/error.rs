//! Error types for the bridge engine.
//!
//! Only [`ConfigError`] ever reaches a caller as an `Err`. The others are
//! produced internally and degrade: an invalid matcher falls back to exact
//! matching, unparseable hook output falls back to exit-code rules, and an
//! evaluator failure becomes a continue-with-warning decision.

use std::path::{Path, PathBuf};

/// A hook configuration source that could not be loaded.
///
/// Always names the offending source so callers can skip it and keep the
/// rest.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The source could not be read.
    #[error("failed to read hook config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source is not a valid hooks document.
    #[error("failed to parse hook config '{}': {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// The document parsed but a hook is missing a required field or holds
    /// an out-of-range value.
    #[error("invalid hook config '{}' at {location}: {message}", path.display())]
    Invalid {
        path: PathBuf,
        location: String,
        message: String,
    },
}

impl ConfigError {
    /// The source this error is attributed to.
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

/// A matcher pattern that is not a valid regular expression.
#[derive(Debug, thiserror::Error)]
#[error("invalid matcher pattern '{pattern}': {source}")]
pub struct MatchError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Hook stdout that looked structured but could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Output is not JSON.
    #[error("hook output is not JSON: {0}")]
    NotJson(String),

    /// Output is JSON but not an object with the recognised field types.
    #[error("hook output has an unexpected shape: {0}")]
    Shape(String),
}

/// Failure reported by a prompt evaluator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvaluatorError {
    /// The request to the model failed.
    #[error("evaluator request failed: {0}")]
    Request(String),

    /// The model returned no text.
    #[error("evaluator returned an empty response")]
    EmptyResponse,
}
