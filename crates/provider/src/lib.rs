//! HTTP client for the conversational voice provider
//!
//! Wraps the third-party call API behind the [`VoiceProvider`] seam
//! from claimcall-core. Payload normalization happens once, in
//! [`adapter`], so nothing above this crate sees the provider's
//! field-name variants.
//!
//! [`VoiceProvider`]: claimcall_core::VoiceProvider

pub mod adapter;
pub mod client;

pub use adapter::parse_conversation_payload;
pub use client::HttpVoiceProvider;

use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<ProviderError> for claimcall_core::Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Network(_) | ProviderError::Timeout => {
                claimcall_core::Error::TransientRemote(err.to_string())
            }
            ProviderError::Api { status, .. } if status >= 500 => {
                claimcall_core::Error::TransientRemote(err.to_string())
            }
            ProviderError::NotFound(id) => {
                claimcall_core::Error::not_found("conversation", id)
            }
            other => claimcall_core::Error::Provider(other.to_string()),
        }
    }
}
