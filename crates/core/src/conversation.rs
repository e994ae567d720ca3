//! Conversation types and completion predicates
//!
//! The voice provider reports conversation state under several field
//! spellings; the provider crate adapts those onto [`ConversationState`]
//! once, at the boundary, so everything above works on a single shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Our automated caller
    Agent,
    /// The insurance representative on the other end
    User,
    /// Provider-injected terminal/system messages
    System,
}

impl TurnRole {
    /// Map the provider's role spellings onto one role.
    /// Unknown spellings are treated as the remote party.
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "agent" | "assistant" | "ai" | "bot" => TurnRole::Agent,
            "system" | "tool" | "call_status" => TurnRole::System,
            _ => TurnRole::User,
        }
    }

    /// Terminal roles only appear once the provider has wrapped up
    /// the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnRole::System)
    }
}

/// One turn of a conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub message: String,
    /// Seconds into the call, when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_call_secs: Option<i64>,
}

impl Turn {
    pub fn new(role: TurnRole, message: impl Into<String>) -> Self {
        Self { role, message: message.into(), time_in_call_secs: None }
    }
}

/// Ordered transcript of a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Normalized remote conversation state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Provider status string, lowercased by the adapter
    pub status: Option<String>,
    /// Remote end timestamp, when reported
    pub ended_at: Option<DateTime<Utc>>,
    pub turns: Vec<Turn>,
}

impl ConversationState {
    pub fn has_activity(&self) -> bool {
        !self.turns.is_empty()
    }
}

/// Why a call was judged complete
///
/// The completion decision is an ordered list of named predicates
/// rather than one boolean expression, so every completion carries an
/// attributable reason tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Local record already says completed
    AlreadyCompleted,
    /// Remote status is one of the terminal spellings
    RemoteStatus,
    /// Remote payload carries an end timestamp
    RemoteEndedAt,
    /// Non-empty transcript whose final turn has a terminal role
    TerminalFinalTurn,
    /// No conversation id and past the abandoned threshold
    NoConversationId,
    /// Hard duration ceiling exceeded, regardless of remote signal
    MaxDurationExceeded,
}

/// Remote status spellings treated as terminal
const TERMINAL_STATUSES: [&str; 4] = ["completed", "ended", "done", "finished"];

fn remote_status_terminal(state: &ConversationState) -> bool {
    state
        .status
        .as_deref()
        .map(|s| TERMINAL_STATUSES.contains(&s.trim().to_lowercase().as_str()))
        .unwrap_or(false)
}

fn remote_ended(state: &ConversationState) -> bool {
    state.ended_at.is_some()
}

fn terminal_final_turn(state: &ConversationState) -> bool {
    state.turns.last().map(|t| t.role.is_terminal()).unwrap_or(false)
}

/// Evaluate the completion predicates in order against the remote
/// state, returning the first reason that fires.
///
/// `locally_completed` comes from the Call row; the remote predicates
/// are an intentionally permissive OR.
pub fn completion_reason(
    locally_completed: bool,
    state: &ConversationState,
) -> Option<CompletionReason> {
    if locally_completed {
        return Some(CompletionReason::AlreadyCompleted);
    }
    if remote_status_terminal(state) {
        return Some(CompletionReason::RemoteStatus);
    }
    if remote_ended(state) {
        return Some(CompletionReason::RemoteEndedAt);
    }
    if terminal_final_turn(state) {
        return Some(CompletionReason::TerminalFinalTurn);
    }
    None
}
