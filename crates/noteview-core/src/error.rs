//! Error types for noteview.

use thiserror::Error;

/// Result type alias using noteview's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for noteview operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A remote record or feed payload could not be admitted (no usable id).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Snapshot fetch or subscription setup failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error is a per-record validation failure.
    ///
    /// Validation failures are dropped with a diagnostic and never fail the
    /// sync controller; every other kind raised during load is terminal.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
