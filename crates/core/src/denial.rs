//! Denial reason rows and their derived status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resubmission lifecycle of one denial reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum DenialReasonStatus {
    #[default]
    Pending,
    Resubmitted,
    Accepted,
}

/// One normalized reason a claim was denied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialReason {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub reason: String,
    pub date_recorded: DateTime<Utc>,
    pub status: DenialReasonStatus,
    pub date_reason_resubmitted: Option<DateTime<Utc>>,
    pub date_accepted: Option<DateTime<Utc>>,
}

impl DenialReason {
    pub fn new(claim_id: Uuid, reason: impl Into<String>, recorded: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            claim_id,
            reason: reason.into(),
            date_recorded: recorded,
            status: DenialReasonStatus::Pending,
            date_reason_resubmitted: None,
            date_accepted: None,
        }
    }

    /// Status is derived from the dates, never stored independently.
    /// An acceptance date wins over a resubmission date when both are set.
    pub fn derive_status(&mut self) {
        self.status = if self.date_accepted.is_some() {
            DenialReasonStatus::Accepted
        } else if self.date_reason_resubmitted.is_some() {
            DenialReasonStatus::Resubmitted
        } else {
            DenialReasonStatus::Pending
        };
    }

    pub fn set_resubmitted(&mut self, date: DateTime<Utc>) {
        self.date_reason_resubmitted = Some(date);
        self.derive_status();
    }

    pub fn set_accepted(&mut self, date: DateTime<Utc>) {
        self.date_accepted = Some(date);
        self.derive_status();
    }

    /// Per-claim dedup key for this reason
    pub fn dedup_key(&self) -> String {
        normalize_reason_key(&self.reason)
    }
}

/// Normalized dedup key: lowercase, trailing punctuation stripped,
/// internal whitespace collapsed. `"Not covered."`, `"not covered"`
/// and `"  NOT COVERED  "` all map to the same key.
pub fn normalize_reason_key(reason: &str) -> String {
    let lowered = reason.to_lowercase();
    let trimmed = lowered.trim().trim_end_matches(['.', ',', '!', '?', ';', ':']);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}
