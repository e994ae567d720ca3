//! Single-flight call dispatch

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use claimcall_core::{Call, Claim, ClaimStore, Result, VoiceProvider};

use crate::prompt::build_claim_prompt;

/// Dispatches the next call when allowed.
///
/// Preconditions, each a short-circuit: the voice toggle is on, and no
/// call is currently active. The check-then-insert is serialized under
/// a dispatch lock so overlapping sweep invocations cannot both
/// observe "no active call" and double-dial.
pub struct Dialer {
    store: Arc<dyn ClaimStore>,
    provider: Arc<dyn VoiceProvider>,
    dispatch_lock: Mutex<()>,
}

impl Dialer {
    pub fn new(store: Arc<dyn ClaimStore>, provider: Arc<dyn VoiceProvider>) -> Self {
        Self { store, provider, dispatch_lock: Mutex::new(()) }
    }

    /// Start the next call if the preconditions hold.
    ///
    /// Returns the dispatched call, or `None` when dispatch was not
    /// attempted (disabled, a call already live, nothing to call, or
    /// the selected claim has no phone number on file).
    pub async fn try_dispatch_next(&self) -> Result<Option<Call>> {
        if !self.store.voice_enabled().await? {
            tracing::debug!("voice disabled, not dispatching");
            return Ok(None);
        }

        let _guard = self.dispatch_lock.lock().await;

        // Fresh read under the lock; the store is the source of truth
        // for the single-active-call invariant.
        let active = self.store.active_calls().await?;
        if let Some(active) = active.first() {
            tracing::debug!(call_id = %active.id, "a call is already active, not dispatching");
            return Ok(None);
        }

        let Some(claim) = self.store.next_claim_to_call().await? else {
            tracing::debug!("no claim eligible for a call");
            return Ok(None);
        };

        let Some(to_number) = claim.claims_phone_number.clone() else {
            tracing::warn!(claim_id = %claim.id, "selected claim has no claims phone number");
            return Ok(None);
        };

        self.dispatch(claim, to_number).await.map(Some)
    }

    async fn dispatch(&self, mut claim: Claim, to_number: String) -> Result<Call> {
        self.provider.update_agent_prompt(&build_claim_prompt(&claim)).await?;
        let dispatched = self.provider.create_call(&to_number).await?;

        let now = Utc::now();
        let mut call = Call::new(to_number, now);
        call.claim_id = Some(claim.id);
        call.conversation_id = dispatched.conversation_id;
        call.call_sid = dispatched.call_sid;

        self.store.insert_call(call.clone()).await?;

        claim.called_at = Some(now);
        self.store.update_claim(&claim).await?;

        tracing::info!(
            call_id = %call.id,
            claim_id = %claim.id,
            conversation_id = call.conversation_id.as_deref().unwrap_or("<pending>"),
            "dispatched outbound call"
        );
        Ok(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use claimcall_core::{ClaimStatus, ConversationState, DispatchedCall};
    use claimcall_store::InMemoryStore;
    use parking_lot::Mutex as SyncMutex;

    #[derive(Default)]
    struct RecordingProvider {
        created: SyncMutex<Vec<String>>,
        prompts: SyncMutex<Vec<String>>,
    }

    #[async_trait]
    impl VoiceProvider for RecordingProvider {
        async fn fetch_conversation(&self, _id: &str) -> Result<ConversationState> {
            Ok(ConversationState::default())
        }
        async fn create_call(&self, to: &str) -> Result<DispatchedCall> {
            self.created.lock().push(to.to_string());
            Ok(DispatchedCall {
                conversation_id: Some(format!("conv-{}", self.created.lock().len())),
                call_sid: Some("CA1".to_string()),
            })
        }
        async fn update_agent_prompt(&self, prompt: &str) -> Result<()> {
            self.prompts.lock().push(prompt.to_string());
            Ok(())
        }
        async fn end_conversation(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn delete_conversation(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn patch_conversation_done(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn hangup(&self, _id: &str) -> Result<()> {
            Ok(())
        }
        async fn end_carrier_call(&self, _sid: &str) -> Result<()> {
            Ok(())
        }
    }

    fn claim_with_phone(patient: &str, phone: &str) -> Claim {
        Claim::new(patient, "Acme Health", Some(phone.to_string()))
    }

    fn dialer_with(store: Arc<InMemoryStore>) -> (Dialer, Arc<RecordingProvider>) {
        let provider = Arc::new(RecordingProvider::default());
        (Dialer::new(store, provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_disabled_toggle_short_circuits() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_claim(claim_with_phone("Pat", "+15550001"));
        let (dialer, provider) = dialer_with(store);

        assert!(dialer.try_dispatch_next().await.unwrap().is_none());
        assert!(provider.created.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_creates_call_and_marks_claim() {
        let store = Arc::new(InMemoryStore::new());
        let claim_id = store.seed_claim(claim_with_phone("Pat", "+15550001"));
        store.set_voice_enabled(true).await.unwrap();
        let (dialer, provider) = dialer_with(store.clone());

        let call = dialer.try_dispatch_next().await.unwrap().expect("should dispatch");
        assert_eq!(call.claim_id, Some(claim_id));
        assert_eq!(call.conversation_id.as_deref(), Some("conv-1"));
        assert_eq!(provider.prompts.lock().len(), 1);

        let claim = store.get_claim(claim_id).await.unwrap().unwrap();
        assert!(claim.called_at.is_some());
        assert_eq!(claim.claim_status, ClaimStatus::Denied);
    }

    #[tokio::test]
    async fn test_active_call_blocks_second_dispatch() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_claim(claim_with_phone("Pat", "+15550001"));
        store.seed_claim(claim_with_phone("Sam", "+15550002"));
        store.set_voice_enabled(true).await.unwrap();
        let (dialer, provider) = dialer_with(store.clone());

        assert!(dialer.try_dispatch_next().await.unwrap().is_some());
        assert!(dialer.try_dispatch_next().await.unwrap().is_none());
        assert_eq!(provider.created.lock().len(), 1);
        assert_eq!(store.active_calls().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_without_phone_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        store.seed_claim(Claim::new("Pat", "Acme Health", None));
        store.set_voice_enabled(true).await.unwrap();
        let (dialer, provider) = dialer_with(store);

        assert!(dialer.try_dispatch_next().await.unwrap().is_none());
        assert!(provider.created.lock().is_empty());
    }
}
