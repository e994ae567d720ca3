//! Claim resolution
//!
//! Maps a finished call back to the claim it was dialed for when the
//! direct foreign key is missing, then applies the extracted denial
//! data to that claim.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use claimcall_core::{
    Call, ClaimStatus, ClaimStore, DenialReason, ExtractedData, Result,
};

/// How far a claim's `called_at` may sit from the call's start and
/// still count as the same dial
const MATCH_WINDOW_HOURS: i64 = 2;

/// What applying an extraction to a claim actually changed
#[derive(Debug, Clone, Default)]
pub struct ResolutionOutcome {
    /// The claim the call was resolved to, when one could be found
    pub claim_id: Option<Uuid>,
    /// Denial reason rows actually inserted (duplicates excluded)
    pub inserted_reasons: usize,
    /// Whether the claim moved `Denied -> Pending Resubmission`
    pub status_advanced: bool,
}

pub struct ClaimResolver {
    store: Arc<dyn ClaimStore>,
}

impl ClaimResolver {
    pub fn new(store: Arc<dyn ClaimStore>) -> Self {
        Self { store }
    }

    /// Resolve which claim a call belongs to.
    ///
    /// Order: the call's own `claim_id`; else the phone match whose
    /// `called_at` falls within the match window of the call's start,
    /// most recent first; else the most recent phone match outright.
    pub async fn resolve_claim_id(&self, call: &Call) -> Result<Option<Uuid>> {
        if let Some(claim_id) = call.claim_id {
            return Ok(Some(claim_id));
        }

        let mut matches = self.store.claims_by_phone(&call.to_number).await?;
        matches.sort_by(|a, b| b.called_at.cmp(&a.called_at));

        let window = Duration::hours(MATCH_WINDOW_HOURS);
        let windowed = matches.iter().find(|claim| {
            claim
                .called_at
                .map(|called| (called - call.started_at).abs() <= window)
                .unwrap_or(false)
        });
        if let Some(claim) = windowed {
            tracing::debug!(call_id = %call.id, claim_id = %claim.id, "resolved claim by phone within window");
            return Ok(Some(claim.id));
        }

        if let Some(claim) = matches.first() {
            tracing::debug!(call_id = %call.id, claim_id = %claim.id, "resolved claim by phone outside window");
            return Ok(Some(claim.id));
        }

        Ok(None)
    }

    /// Resolve the call's claim and apply the extracted data to it.
    ///
    /// A resolved claim id is written back onto the call so later
    /// sweeps skip the fallback search. An unresolved claim is a
    /// recoverable condition, not an error: the caller still persists
    /// the call's transcript and extraction.
    pub async fn apply_extraction(
        &self,
        call: &mut Call,
        extracted: &ExtractedData,
    ) -> Result<ResolutionOutcome> {
        let Some(claim_id) = self.resolve_claim_id(call).await? else {
            tracing::warn!(call_id = %call.id, to_number = %call.to_number, "no claim could be resolved for call");
            return Ok(ResolutionOutcome::default());
        };
        call.claim_id = Some(claim_id);

        let Some(mut claim) = self.store.get_claim(claim_id).await? else {
            tracing::warn!(call_id = %call.id, claim_id = %claim_id, "resolved claim no longer exists");
            return Ok(ResolutionOutcome::default());
        };

        let now = Utc::now();
        let mut inserted = 0;
        for reason in &extracted.denial_reasons {
            if self
                .store
                .insert_denial_reason(DenialReason::new(claim_id, reason.clone(), now))
                .await?
            {
                inserted += 1;
            }
        }

        let mut claim_dirty = false;
        let mut status_advanced = false;
        // A claim only advances when a new reason was actually recorded.
        if inserted > 0 && claim.claim_status == ClaimStatus::Denied {
            claim.claim_status = ClaimStatus::PendingResubmission;
            claim_dirty = true;
            status_advanced = true;
        }
        if let Some(next_steps) = &extracted.next_steps {
            if claim.next_steps.as_deref() != Some(next_steps) {
                claim.next_steps = Some(next_steps.clone());
                claim_dirty = true;
            }
        }
        if claim_dirty {
            self.store.update_claim(&claim).await?;
        }

        tracing::info!(
            call_id = %call.id,
            claim_id = %claim_id,
            inserted_reasons = inserted,
            status_advanced,
            "applied extraction to claim"
        );
        Ok(ResolutionOutcome { claim_id: Some(claim_id), inserted_reasons: inserted, status_advanced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimcall_core::Claim;
    use claimcall_store::InMemoryStore;

    fn call_to(number: &str, started_minutes_ago: i64) -> Call {
        Call::new(number, Utc::now() - Duration::minutes(started_minutes_ago))
    }

    fn claim_called_at(phone: &str, called_minutes_ago: Option<i64>) -> Claim {
        let mut claim = Claim::new("Pat", "Acme Health", Some(phone.to_string()));
        claim.called_at = called_minutes_ago.map(|m| Utc::now() - Duration::minutes(m));
        claim
    }

    #[tokio::test]
    async fn test_direct_claim_id_wins() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());

        let direct = store.seed_claim(claim_called_at("+15550001", Some(10)));
        let mut call = call_to("+15550001", 5);
        call.claim_id = Some(direct);

        assert_eq!(resolver.resolve_claim_id(&call).await.unwrap(), Some(direct));
    }

    #[tokio::test]
    async fn test_windowed_match_preferred_over_stale_match() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());

        // Call started 60 minutes ago; claim A was dialed 90 minutes
        // ago (inside the 2h window), claim B three hours before that.
        let inside = store.seed_claim(claim_called_at("+15550001", Some(90)));
        store.seed_claim(claim_called_at("+15550001", Some(240)));

        let call = call_to("+15550001", 60);
        assert_eq!(resolver.resolve_claim_id(&call).await.unwrap(), Some(inside));
    }

    #[tokio::test]
    async fn test_falls_back_to_most_recent_match_outside_window() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());

        let recent = store.seed_claim(claim_called_at("+15550001", Some(300)));
        store.seed_claim(claim_called_at("+15550001", Some(600)));

        let call = call_to("+15550001", 5);
        assert_eq!(resolver.resolve_claim_id(&call).await.unwrap(), Some(recent));
    }

    #[tokio::test]
    async fn test_unresolved_call_is_recoverable() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());

        let mut call = call_to("+15559999", 5);
        let extracted = ExtractedData {
            denial_reasons: vec!["not covered".to_string()],
            next_steps: None,
        };
        let outcome = resolver.apply_extraction(&mut call, &extracted).await.unwrap();
        assert!(outcome.claim_id.is_none());
        assert_eq!(outcome.inserted_reasons, 0);
    }

    #[tokio::test]
    async fn test_new_reason_advances_denied_claim() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());
        let claim_id = store.seed_claim(claim_called_at("+15550001", Some(10)));

        let mut call = call_to("+15550001", 5);
        let extracted = ExtractedData {
            denial_reasons: vec!["the prior authorization was missing".to_string()],
            next_steps: Some("You need to resubmit with the auth number".to_string()),
        };
        let outcome = resolver.apply_extraction(&mut call, &extracted).await.unwrap();

        assert_eq!(outcome.claim_id, Some(claim_id));
        assert_eq!(outcome.inserted_reasons, 1);
        assert!(outcome.status_advanced);
        assert_eq!(call.claim_id, Some(claim_id));

        let claim = store.get_claim(claim_id).await.unwrap().unwrap();
        assert_eq!(claim.claim_status, ClaimStatus::PendingResubmission);
        assert_eq!(claim.next_steps.as_deref(), Some("You need to resubmit with the auth number"));
    }

    #[tokio::test]
    async fn test_duplicate_reasons_do_not_advance_status_again() {
        let store = Arc::new(InMemoryStore::new());
        let resolver = ClaimResolver::new(store.clone());
        let claim_id = store.seed_claim(claim_called_at("+15550001", Some(10)));

        let mut call = call_to("+15550001", 5);
        let extracted = ExtractedData {
            denial_reasons: vec!["Not covered.".to_string()],
            next_steps: None,
        };
        resolver.apply_extraction(&mut call, &extracted).await.unwrap();

        // Re-processing the same transcript inserts nothing new.
        let again = ExtractedData {
            denial_reasons: vec!["not covered".to_string()],
            next_steps: None,
        };
        let outcome = resolver.apply_extraction(&mut call, &again).await.unwrap();
        assert_eq!(outcome.inserted_reasons, 0);
        assert!(!outcome.status_advanced);

        assert_eq!(store.denial_reasons_for_claim(claim_id).await.unwrap().len(), 1);
    }
}
