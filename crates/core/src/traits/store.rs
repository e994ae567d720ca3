//! Store interface
//!
//! The engine treats the backing store as a transactional row store
//! with filtered range queries. The store is the single source of
//! truth: components read immediately before deciding and write
//! immediately after, never caching rows across sweeps.
//!
//! Implementations:
//! - `InMemoryStore` (claimcall-store) - default, used by the server
//!   binary and tests
//! - a relational backend can implement the same seam without the
//!   engine changing

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::call::Call;
use crate::claim::Claim;
use crate::denial::DenialReason;
use crate::error::Result;

/// Process-wide toggle gating whether the dialer may start new calls.
/// Stored as a singleton; the most recently created row wins when
/// duplicates exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub id: Uuid,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl VoiceSettings {
    pub fn new(enabled: bool) -> Self {
        Self { id: Uuid::new_v4(), enabled, created_at: Utc::now() }
    }
}

/// Row-level access to calls, claims, denial reasons and the voice
/// settings singleton.
#[async_trait]
pub trait ClaimStore: Send + Sync {
    // Calls

    async fn get_call(&self, id: Uuid) -> Result<Option<Call>>;

    async fn get_call_by_conversation(&self, conversation_id: &str) -> Result<Option<Call>>;

    async fn insert_call(&self, call: Call) -> Result<()>;

    /// Full-row update keyed by `call.id`
    async fn update_call(&self, call: &Call) -> Result<()>;

    /// Calls with `status in {initiated, in_progress}` and no `ended_at`
    async fn active_calls(&self) -> Result<Vec<Call>>;

    /// Calls in need of reconciliation, the union of:
    /// - active calls started more than `grace` ago
    /// - calls completed within `recent_window` whose extracted data is
    ///   missing or empty
    /// - calls started within `recent_window` lacking extracted data,
    ///   regardless of status
    async fn reconciliation_candidates(
        &self,
        now: DateTime<Utc>,
        grace: Duration,
        recent_window: Duration,
    ) -> Result<Vec<Call>>;

    // Claims

    async fn get_claim(&self, id: Uuid) -> Result<Option<Claim>>;

    async fn update_claim(&self, claim: &Claim) -> Result<()>;

    /// Claims whose insurer phone matches, unordered
    async fn claims_by_phone(&self, phone: &str) -> Result<Vec<Claim>>;

    /// Dial priority: oldest Denied, else oldest Pending Resubmission,
    /// else oldest never-called claim
    async fn next_claim_to_call(&self) -> Result<Option<Claim>>;

    // Denial reasons

    /// Reasons recorded for a claim, insertion order
    async fn denial_reasons_for_claim(&self, claim_id: Uuid) -> Result<Vec<DenialReason>>;

    /// Insert a reason unless one with the same normalized key already
    /// exists for the claim. Returns whether a row was inserted; a
    /// duplicate is a no-op, not an error.
    async fn insert_denial_reason(&self, reason: DenialReason) -> Result<bool>;

    /// Write path for resubmission tracking. The engine only inserts
    /// reasons; dashboard claim actions mark them resubmitted or
    /// accepted through this seam.
    async fn update_denial_reason(&self, reason: &DenialReason) -> Result<()>;

    // Voice settings

    async fn voice_enabled(&self) -> Result<bool>;

    async fn set_voice_enabled(&self, enabled: bool) -> Result<()>;
}
