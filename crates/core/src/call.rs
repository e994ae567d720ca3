//! Call row types
//!
//! A `Call` is one outbound voice session tracked locally and mirrored
//! against a remote conversational session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Transcript;

/// Local lifecycle status of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[derive(Default)]
pub enum CallStatus {
    /// Created by the dialer, no transcript activity observed yet
    #[default]
    Initiated,
    /// Transcript activity has been observed on the remote session
    InProgress,
    /// Terminal state; `ended_at` is always set alongside this
    Completed,
}

impl CallStatus {
    /// Whether the call counts against the single-active-call invariant
    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Initiated | CallStatus::InProgress)
    }
}

/// Structured denial data pulled out of a transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedData {
    /// Deduplicated denial reasons, first-seen order
    pub denial_reasons: Vec<String>,
    /// First next-step instruction the representative gave, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<String>,
}

impl ExtractedData {
    pub fn is_empty(&self) -> bool {
        self.denial_reasons.is_empty() && self.next_steps.is_none()
    }
}

/// One outbound voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: Uuid,
    /// May be unset at creation; the claim resolver fills it in later
    pub claim_id: Option<Uuid>,
    /// Opaque remote session reference, immutable once set
    pub conversation_id: Option<String>,
    /// Telephony-carrier session id, when the provider reports one
    pub call_sid: Option<String>,
    pub to_number: String,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    /// Set if and only if `status == Completed`
    pub ended_at: Option<DateTime<Utc>>,
    pub transcript: Option<Transcript>,
    pub extracted_data: Option<ExtractedData>,
}

impl Call {
    /// New call as the dialer creates it
    pub fn new(to_number: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            claim_id: None,
            conversation_id: None,
            call_sid: None,
            to_number: to_number.into(),
            status: CallStatus::Initiated,
            started_at,
            ended_at: None,
            transcript: None,
            extracted_data: None,
        }
    }

    /// Active means not yet concluded locally
    pub fn is_active(&self) -> bool {
        self.status.is_active() && self.ended_at.is_none()
    }

    /// Mark the call concluded, keeping `ended_at`/`status` in lockstep.
    /// Idempotent: a second writer re-applies the same terminal state
    /// without moving an already-set end timestamp.
    pub fn mark_completed(&mut self, ended_at: DateTime<Utc>) {
        self.status = CallStatus::Completed;
        if self.ended_at.is_none() {
            self.ended_at = Some(ended_at);
        }
    }

    /// Whether extraction still needs to run for this call
    pub fn needs_extraction(&self) -> bool {
        self.extracted_data.as_ref().map_or(true, ExtractedData::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_call_is_active() {
        let call = Call::new("+15551234567", Utc::now());
        assert_eq!(call.status, CallStatus::Initiated);
        assert!(call.is_active());
        assert!(call.needs_extraction());
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut call = Call::new("+15551234567", Utc::now());
        let first = Utc::now();
        call.mark_completed(first);
        let later = first + chrono::Duration::minutes(5);
        call.mark_completed(later);

        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.ended_at, Some(first));
        assert!(!call.is_active());
    }
}
