//! Trait seams for pluggable backends

pub mod store;
pub mod voice;

pub use store::{ClaimStore, VoiceSettings};
pub use voice::{DispatchedCall, VoiceProvider};
