//! Voice provider interface
//!
//! Thin seam over the third-party conversational-call API. The engine
//! depends only on these request/response shapes, not on the provider's
//! transport or payload spellings.
//!
//! Implementations:
//! - `HttpVoiceProvider` (claimcall-provider) - reqwest client
//! - scripted mocks in the engine's tests

use async_trait::async_trait;

use crate::conversation::ConversationState;
use crate::error::Result;

/// What the provider hands back when a call is created
#[derive(Debug, Clone, Default)]
pub struct DispatchedCall {
    /// Remote session reference; occasionally absent until the provider
    /// assigns one
    pub conversation_id: Option<String>,
    /// Telephony-carrier session id
    pub call_sid: Option<String>,
}

#[async_trait]
pub trait VoiceProvider: Send + Sync {
    /// Fetch remote conversation state, normalized onto
    /// [`ConversationState`] by the implementation's adapter.
    async fn fetch_conversation(&self, conversation_id: &str) -> Result<ConversationState>;

    /// Start an outbound call to `to_number`
    async fn create_call(&self, to_number: &str) -> Result<DispatchedCall>;

    /// Replace the agent's prompt ahead of the next call
    async fn update_agent_prompt(&self, prompt: &str) -> Result<()>;

    // Termination strategies, tried in order by the call terminator.

    /// Explicit end-conversation request
    async fn end_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Delete the remote session. Implementations surface a provider
    /// 404 as `Error::NotFound`; the terminator treats that as already
    /// ended.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;

    /// Patch the session status to done
    async fn patch_conversation_done(&self, conversation_id: &str) -> Result<()>;

    /// Provider-side hangup
    async fn hangup(&self, conversation_id: &str) -> Result<()>;

    /// Carrier-specific end call, available when a telephony session id
    /// is known
    async fn end_carrier_call(&self, call_sid: &str) -> Result<()>;
}
