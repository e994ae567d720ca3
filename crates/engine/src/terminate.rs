//! Best-effort remote session teardown
//!
//! Tries an ordered sequence of distinct provider termination
//! operations and stops at the first success. Total failure is
//! non-fatal: local state always wins, the caller marks the call
//! completed either way.

use std::sync::Arc;

use claimcall_core::{Error, VoiceProvider};

/// Which teardown operation ended the remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationStrategy {
    EndConversation,
    DeleteConversation,
    StatusPatch,
    Hangup,
    CarrierEndCall,
}

pub struct CallTerminator {
    provider: Arc<dyn VoiceProvider>,
}

impl CallTerminator {
    pub fn new(provider: Arc<dyn VoiceProvider>) -> Self {
        Self { provider }
    }

    /// Ask the provider to end the session, trying each strategy in
    /// order. Returns the strategy that succeeded, or `None` when all
    /// of them failed and the remote session may still be open.
    pub async fn terminate(
        &self,
        conversation_id: &str,
        call_sid: Option<&str>,
    ) -> Option<TerminationStrategy> {
        use TerminationStrategy::*;

        if self.attempt(EndConversation, self.provider.end_conversation(conversation_id)).await {
            return Some(EndConversation);
        }

        // A 404 on delete means the session is already gone, which is
        // the outcome we wanted.
        match self.provider.delete_conversation(conversation_id).await {
            Ok(()) | Err(Error::NotFound { .. }) => return Some(DeleteConversation),
            Err(e) => {
                tracing::debug!(conversation_id, strategy = ?DeleteConversation, error = %e, "termination strategy failed");
            }
        }

        if self.attempt(StatusPatch, self.provider.patch_conversation_done(conversation_id)).await
        {
            return Some(StatusPatch);
        }
        if self.attempt(Hangup, self.provider.hangup(conversation_id)).await {
            return Some(Hangup);
        }
        if let Some(sid) = call_sid {
            if self.attempt(CarrierEndCall, self.provider.end_carrier_call(sid)).await {
                return Some(CarrierEndCall);
            }
        }

        tracing::warn!(
            conversation_id,
            "every termination strategy failed; remote session may still be open"
        );
        None
    }

    async fn attempt(
        &self,
        strategy: TerminationStrategy,
        op: impl std::future::Future<Output = claimcall_core::Result<()>>,
    ) -> bool {
        match op.await {
            Ok(()) => {
                tracing::info!(strategy = ?strategy, "remote session ended");
                true
            }
            Err(e) => {
                tracing::debug!(strategy = ?strategy, error = %e, "termination strategy failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claimcall_core::{ConversationState, DispatchedCall, Result};
    use parking_lot::Mutex;

    /// Provider whose termination operations fail until the named one
    #[derive(Default)]
    struct ScriptedProvider {
        succeed_on: Option<TerminationStrategy>,
        delete_reports_not_found: bool,
        attempts: Mutex<Vec<TerminationStrategy>>,
    }

    impl ScriptedProvider {
        fn outcome(&self, strategy: TerminationStrategy) -> Result<()> {
            self.attempts.lock().push(strategy);
            if self.succeed_on == Some(strategy) {
                Ok(())
            } else {
                Err(Error::TransientRemote("nope".to_string()))
            }
        }
    }

    #[async_trait]
    impl VoiceProvider for ScriptedProvider {
        async fn fetch_conversation(&self, _id: &str) -> Result<ConversationState> {
            Ok(ConversationState::default())
        }
        async fn create_call(&self, _to: &str) -> Result<DispatchedCall> {
            Ok(DispatchedCall::default())
        }
        async fn update_agent_prompt(&self, _prompt: &str) -> Result<()> {
            Ok(())
        }
        async fn end_conversation(&self, _id: &str) -> Result<()> {
            self.outcome(TerminationStrategy::EndConversation)
        }
        async fn delete_conversation(&self, _id: &str) -> Result<()> {
            self.attempts.lock().push(TerminationStrategy::DeleteConversation);
            if self.delete_reports_not_found {
                Err(Error::not_found("conversation", "gone"))
            } else if self.succeed_on == Some(TerminationStrategy::DeleteConversation) {
                Ok(())
            } else {
                Err(Error::TransientRemote("nope".to_string()))
            }
        }
        async fn patch_conversation_done(&self, _id: &str) -> Result<()> {
            self.outcome(TerminationStrategy::StatusPatch)
        }
        async fn hangup(&self, _id: &str) -> Result<()> {
            self.outcome(TerminationStrategy::Hangup)
        }
        async fn end_carrier_call(&self, _sid: &str) -> Result<()> {
            self.outcome(TerminationStrategy::CarrierEndCall)
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_the_sequence() {
        let provider = Arc::new(ScriptedProvider {
            succeed_on: Some(TerminationStrategy::EndConversation),
            ..Default::default()
        });
        let terminator = CallTerminator::new(provider.clone());

        let used = terminator.terminate("conv-1", None).await;
        assert_eq!(used, Some(TerminationStrategy::EndConversation));
        assert_eq!(provider.attempts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_not_found_counts_as_success() {
        let provider = Arc::new(ScriptedProvider {
            delete_reports_not_found: true,
            ..Default::default()
        });
        let terminator = CallTerminator::new(provider.clone());

        let used = terminator.terminate("conv-1", None).await;
        assert_eq!(used, Some(TerminationStrategy::DeleteConversation));
    }

    #[tokio::test]
    async fn test_carrier_end_call_requires_sid() {
        let provider = Arc::new(ScriptedProvider {
            succeed_on: Some(TerminationStrategy::CarrierEndCall),
            ..Default::default()
        });
        let terminator = CallTerminator::new(provider.clone());

        assert_eq!(terminator.terminate("conv-1", None).await, None);
        assert_eq!(
            terminator.terminate("conv-1", Some("CA123")).await,
            Some(TerminationStrategy::CarrierEndCall)
        );
    }

    #[tokio::test]
    async fn test_total_failure_is_reported_not_fatal() {
        let provider = Arc::new(ScriptedProvider::default());
        let terminator = CallTerminator::new(provider.clone());

        assert_eq!(terminator.terminate("conv-1", Some("CA123")).await, None);
        // Every strategy was attempted in order.
        let attempts = provider.attempts.lock();
        assert_eq!(
            *attempts,
            vec![
                TerminationStrategy::EndConversation,
                TerminationStrategy::DeleteConversation,
                TerminationStrategy::StatusPatch,
                TerminationStrategy::Hangup,
                TerminationStrategy::CarrierEndCall,
            ]
        );
    }
}
