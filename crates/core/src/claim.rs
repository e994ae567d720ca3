//! Claim row types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Workflow status of a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum ClaimStatus {
    /// Denied by the insurer; next in line for an outbound call
    #[default]
    Denied,
    /// At least one denial reason was recorded and resubmission is due
    #[serde(rename = "Pending Resubmission")]
    PendingResubmission,
    /// Resubmitted, waiting on the insurer
    #[serde(rename = "Awaiting Acceptance")]
    AwaitingAcceptance,
    Complete,
}

/// A denial/resubmission unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    pub patient_name: String,
    pub provider_name: String,
    pub claim_status: ClaimStatus,
    /// Set the first time the dialer dispatches a call for this claim
    pub called_at: Option<DateTime<Utc>>,
    /// Insurer claims line, denormalized from the related provider
    pub claims_phone_number: Option<String>,
    /// Next-step instruction extracted from the most recent call
    pub next_steps: Option<String>,
    pub office_name: Option<String>,
    pub doctor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    pub fn new(
        patient_name: impl Into<String>,
        provider_name: impl Into<String>,
        claims_phone_number: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_name: patient_name.into(),
            provider_name: provider_name.into(),
            claim_status: ClaimStatus::Denied,
            called_at: None,
            claims_phone_number,
            next_steps: None,
            office_name: None,
            doctor_name: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_uses_display_labels() {
        let json = serde_json::to_string(&ClaimStatus::PendingResubmission).unwrap();
        assert_eq!(json, "\"Pending Resubmission\"");
        let back: ClaimStatus = serde_json::from_str("\"Awaiting Acceptance\"").unwrap();
        assert_eq!(back, ClaimStatus::AwaitingAcceptance);
    }
}
