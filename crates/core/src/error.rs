//! Shared error types

use thiserror::Error;

/// Errors shared across the engine crates
#[derive(Error, Debug)]
pub enum Error {
    /// Provider request failed or timed out; the caller should retry
    /// on a later sweep rather than treat the call as ended.
    #[error("Transient provider failure: {0}")]
    TransientRemote(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Transcript was empty even after the delayed retry fetch.
    #[error("Transcript not yet available for conversation {0}")]
    TranscriptNotReady(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { kind, id: id.into() }
    }

    /// Transient failures are retried on the next sweep instead of
    /// aborting candidate processing.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientRemote(_) | Error::TranscriptNotReady(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::TransientRemote("502".to_string()).is_transient());
        assert!(Error::TranscriptNotReady("conv-1".to_string()).is_transient());
        assert!(!Error::not_found("call", "x").is_transient());
        assert!(!Error::InvalidInput("missing id".to_string()).is_transient());
        assert!(!Error::Provider("bad payload".to_string()).is_transient());
    }
}
