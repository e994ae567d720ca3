//! Claim Call Server
//!
//! HTTP surface for the call lifecycle engine: the reconciliation
//! trigger, explicit call-end and transcript-processing operations,
//! the voice toggle, and the sweep scheduler.

pub mod http;
pub mod metrics;
pub mod scheduler;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler, record_sweep};
pub use scheduler::spawn_sweep_loop;
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Voice provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Transcript not ready: {0}")]
    TranscriptNotReady(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::ProviderUnavailable(_) => axum::http::StatusCode::BAD_GATEWAY,
            ServerError::TranscriptNotReady(_) => axum::http::StatusCode::CONFLICT,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<claimcall_core::Error> for ServerError {
    fn from(err: claimcall_core::Error) -> Self {
        use claimcall_core::Error;
        match err {
            Error::NotFound { .. } => ServerError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            Error::TransientRemote(msg) | Error::Provider(msg) => {
                ServerError::ProviderUnavailable(msg)
            }
            Error::TranscriptNotReady(id) => ServerError::TranscriptNotReady(id),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
