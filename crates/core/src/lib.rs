//! Core traits and types for the claim call engine
//!
//! This crate provides foundational types used across all other crates:
//! - Call, Claim, DenialReason and VoiceSettings rows
//! - The normalized conversation state and completion predicates
//! - Trait seams for the store and the voice provider
//! - Error types

pub mod call;
pub mod claim;
pub mod conversation;
pub mod denial;
pub mod error;
pub mod traits;

pub use call::{Call, CallStatus, ExtractedData};
pub use claim::{Claim, ClaimStatus};
pub use conversation::{
    completion_reason, CompletionReason, ConversationState, Transcript, Turn, TurnRole,
};
pub use denial::{normalize_reason_key, DenialReason, DenialReasonStatus};
pub use error::{Error, Result};
pub use traits::{ClaimStore, DispatchedCall, VoiceProvider, VoiceSettings};
