//! Error types for everything outside the per-frame core.

use std::io;

use thiserror::Error;

/// Failure reading a JSON-lines pose recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read pose recording: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: malformed pose frame: {source}")]
    Parse {
        line:   usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: timestamp {value} is not a finite, non-negative number of seconds")]
    BadTimestamp { line: usize, value: f64 },
}

#[derive(Debug, Error)]
pub enum OrchestraError {
    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("invalid argument {flag}: {reason}")]
    InvalidArgument { flag: String, reason: String },
}

impl OrchestraError {
    pub fn invalid_argument(flag: &str, reason: impl Into<String>) -> Self {
        OrchestraError::InvalidArgument { flag: flag.to_string(), reason: reason.into() }
    }
}
