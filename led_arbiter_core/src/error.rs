//! Error taxonomy for the arbitration core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Caller named an indicator the catalog does not contain.
    #[error("unknown indicator: {id}")]
    InvalidArgument { id: String },

    /// Post-recompute check of the engine invariants failed.
    #[error("arbitration invariant violated: {message}")]
    InvariantViolation { message: String },

    #[error("invalid catalog: {message}")]
    Config { message: String },

    #[error("catalog file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("failed to parse catalog: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument(id: impl Into<String>) -> Self {
        Self::InvalidArgument { id: id.into() }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
