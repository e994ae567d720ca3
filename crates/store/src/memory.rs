//! Concurrent in-memory row store

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use claimcall_core::{
    normalize_reason_key, Call, Claim, ClaimStatus, ClaimStore, DenialReason, Error, Result,
    VoiceSettings,
};

/// DashMap-backed [`ClaimStore`]
#[derive(Default)]
pub struct InMemoryStore {
    calls: DashMap<Uuid, Call>,
    claims: DashMap<Uuid, Claim>,
    denial_reasons: DashMap<Uuid, DenialReason>,
    /// Singleton rows; the most recently created wins
    voice_settings: RwLock<Vec<VoiceSettings>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a claim, returning its id. Test and bootstrap helper.
    pub fn seed_claim(&self, claim: Claim) -> Uuid {
        let id = claim.id;
        self.claims.insert(id, claim);
        id
    }
}

#[async_trait]
impl ClaimStore for InMemoryStore {
    async fn get_call(&self, id: Uuid) -> Result<Option<Call>> {
        Ok(self.calls.get(&id).map(|c| c.clone()))
    }

    async fn get_call_by_conversation(&self, conversation_id: &str) -> Result<Option<Call>> {
        Ok(self
            .calls
            .iter()
            .find(|c| c.conversation_id.as_deref() == Some(conversation_id))
            .map(|c| c.clone()))
    }

    async fn insert_call(&self, call: Call) -> Result<()> {
        self.calls.insert(call.id, call);
        Ok(())
    }

    async fn update_call(&self, call: &Call) -> Result<()> {
        if !self.calls.contains_key(&call.id) {
            return Err(Error::not_found("call", call.id.to_string()));
        }
        self.calls.insert(call.id, call.clone());
        Ok(())
    }

    async fn active_calls(&self) -> Result<Vec<Call>> {
        Ok(self.calls.iter().filter(|c| c.is_active()).map(|c| c.clone()).collect())
    }

    async fn reconciliation_candidates(
        &self,
        now: DateTime<Utc>,
        grace: Duration,
        recent_window: Duration,
    ) -> Result<Vec<Call>> {
        let recent_cutoff = now - recent_window;
        let mut candidates: Vec<Call> = self
            .calls
            .iter()
            .filter(|c| {
                let aged_active = c.is_active() && c.started_at <= now - grace;
                let completed_unextracted = !c.is_active()
                    && c.ended_at.map_or(false, |t| t >= recent_cutoff)
                    && c.needs_extraction();
                let recent_unextracted = c.started_at >= recent_cutoff && c.needs_extraction();
                aged_active || completed_unextracted || recent_unextracted
            })
            .map(|c| c.clone())
            .collect();
        candidates.sort_by_key(|c| c.started_at);
        Ok(candidates)
    }

    async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>> {
        Ok(self.claims.get(&id).map(|c| c.clone()))
    }

    async fn update_claim(&self, claim: &Claim) -> Result<()> {
        if !self.claims.contains_key(&claim.id) {
            return Err(Error::not_found("claim", claim.id.to_string()));
        }
        self.claims.insert(claim.id, claim.clone());
        Ok(())
    }

    async fn claims_by_phone(&self, phone: &str) -> Result<Vec<Claim>> {
        Ok(self
            .claims
            .iter()
            .filter(|c| c.claims_phone_number.as_deref() == Some(phone))
            .map(|c| c.clone())
            .collect())
    }

    async fn next_claim_to_call(&self) -> Result<Option<Claim>> {
        let oldest = |pred: &dyn Fn(&Claim) -> bool| -> Option<Claim> {
            self.claims
                .iter()
                .filter(|c| pred(c.value()))
                .map(|c| c.clone())
                .min_by_key(|c| c.created_at)
        };

        Ok(oldest(&|c| c.claim_status == ClaimStatus::Denied)
            .or_else(|| oldest(&|c| c.claim_status == ClaimStatus::PendingResubmission))
            .or_else(|| oldest(&|c| c.called_at.is_none())))
    }

    async fn denial_reasons_for_claim(&self, claim_id: Uuid) -> Result<Vec<DenialReason>> {
        let mut reasons: Vec<DenialReason> = self
            .denial_reasons
            .iter()
            .filter(|r| r.claim_id == claim_id)
            .map(|r| r.clone())
            .collect();
        reasons.sort_by_key(|r| r.date_recorded);
        Ok(reasons)
    }

    async fn insert_denial_reason(&self, reason: DenialReason) -> Result<bool> {
        let key = reason.dedup_key();
        let duplicate = self
            .denial_reasons
            .iter()
            .any(|r| r.claim_id == reason.claim_id && normalize_reason_key(&r.reason) == key);
        if duplicate {
            tracing::debug!(claim_id = %reason.claim_id, key, "skipping duplicate denial reason");
            return Ok(false);
        }
        self.denial_reasons.insert(reason.id, reason);
        Ok(true)
    }

    async fn update_denial_reason(&self, reason: &DenialReason) -> Result<()> {
        if !self.denial_reasons.contains_key(&reason.id) {
            return Err(Error::not_found("denial_reason", reason.id.to_string()));
        }
        self.denial_reasons.insert(reason.id, reason.clone());
        Ok(())
    }

    async fn voice_enabled(&self) -> Result<bool> {
        let rows = self.voice_settings.read();
        Ok(rows
            .iter()
            .max_by_key(|s| s.created_at)
            .map(|s| s.enabled)
            .unwrap_or(false))
    }

    async fn set_voice_enabled(&self, enabled: bool) -> Result<()> {
        self.voice_settings.write().push(VoiceSettings::new(enabled));
        Ok(())
    }
}
