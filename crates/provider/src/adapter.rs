//! Provider payload normalization
//!
//! The provider reports conversation state under several field
//! spellings depending on API version and endpoint: the status lives
//! in `status` or `conversation_status`, the transcript in
//! `transcript` or `messages`, end times arrive as RFC 3339 strings or
//! epoch seconds. This adapter maps every variant onto
//! [`ConversationState`] in one place.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use claimcall_core::{ConversationState, Turn, TurnRole};

/// Normalize a raw conversation payload.
pub fn parse_conversation_payload(payload: &Value) -> ConversationState {
    ConversationState {
        status: parse_status(payload),
        ended_at: parse_ended_at(payload),
        turns: parse_turns(payload),
    }
}

fn parse_status(payload: &Value) -> Option<String> {
    ["status", "conversation_status", "call_status"]
        .iter()
        .find_map(|key| payload.get(*key))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
}

fn parse_ended_at(payload: &Value) -> Option<DateTime<Utc>> {
    let raw = ["ended_at", "end_time", "call_end_time"]
        .iter()
        .find_map(|key| payload.get(*key))?;

    match raw {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

fn parse_turns(payload: &Value) -> Vec<Turn> {
    let list = ["transcript", "messages", "turns"]
        .iter()
        .find_map(|key| payload.get(*key))
        .and_then(Value::as_array);

    let Some(list) = list else { return Vec::new() };
    list.iter().filter_map(parse_turn).collect()
}

fn parse_turn(item: &Value) -> Option<Turn> {
    // Some endpoints return bare strings for system notices.
    if let Some(text) = item.as_str() {
        return Some(Turn::new(TurnRole::System, text));
    }

    let role = ["role", "speaker", "source"]
        .iter()
        .find_map(|key| item.get(*key))
        .and_then(Value::as_str)
        .map(TurnRole::parse)
        .unwrap_or(TurnRole::User);

    let message = ["message", "text", "content"]
        .iter()
        .find_map(|key| item.get(*key))
        .and_then(Value::as_str)?
        .to_string();

    let time_in_call_secs = ["time_in_call_secs", "seconds_in_call"]
        .iter()
        .find_map(|key| item.get(*key))
        .and_then(Value::as_i64);

    Some(Turn { role, message, time_in_call_secs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_field_variants() {
        let a = parse_conversation_payload(&json!({"status": "Done"}));
        assert_eq!(a.status.as_deref(), Some("done"));

        let b = parse_conversation_payload(&json!({"conversation_status": "processing"}));
        assert_eq!(b.status.as_deref(), Some("processing"));
    }

    #[test]
    fn test_ended_at_rfc3339_and_epoch() {
        let a = parse_conversation_payload(&json!({"ended_at": "2026-08-30T12:00:00Z"}));
        assert!(a.ended_at.is_some());

        let b = parse_conversation_payload(&json!({"end_time": 1_767_000_000}));
        assert!(b.ended_at.is_some());

        let c = parse_conversation_payload(&json!({"ended_at": null}));
        assert!(c.ended_at.is_none());
    }

    #[test]
    fn test_transcript_and_messages_both_accepted() {
        let payload = json!({
            "messages": [
                {"role": "agent", "message": "Calling about claim 123"},
                {"speaker": "user", "text": "It was denied", "seconds_in_call": 42},
            ]
        });
        let state = parse_conversation_payload(&payload);
        assert_eq!(state.turns.len(), 2);
        assert_eq!(state.turns[0].role, TurnRole::Agent);
        assert_eq!(state.turns[1].message, "It was denied");
        assert_eq!(state.turns[1].time_in_call_secs, Some(42));
    }

    #[test]
    fn test_bare_string_turn_is_system() {
        let payload = json!({"transcript": ["call ended by system"]});
        let state = parse_conversation_payload(&payload);
        assert_eq!(state.turns[0].role, TurnRole::System);
    }

    #[test]
    fn test_empty_payload() {
        let state = parse_conversation_payload(&json!({}));
        assert!(state.status.is_none());
        assert!(state.ended_at.is_none());
        assert!(state.turns.is_empty());
    }
}
