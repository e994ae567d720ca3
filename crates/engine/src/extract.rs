//! Transcript extraction
//!
//! Pure, deterministic mapping from a conversation transcript to
//! structured denial data. Three passes run in order, each only when
//! the previous ones produced nothing: a keyword scan over the
//! representative's turns, regex templates over the full transcript,
//! and a sentence-level backstop. Candidates are deduplicated on the
//! same normalized key the store uses for denial reasons, keeping the
//! first-seen casing and order.

use once_cell::sync::Lazy;
use regex::Regex;

use claimcall_core::{normalize_reason_key, ExtractedData, Transcript, TurnRole};

/// Keywords marking a representative turn as denial-related
const DENIAL_KEYWORDS: [&str; 5] = ["denied", "denial", "rejected", "not covered", "not eligible"];

/// Phrases marking a next-step instruction
const NEXT_STEP_PHRASES: [&str; 4] = ["next step", "you need to", "to fix", "to resolve"];

/// Templates for pulling the reason clause out of running text
static REASON_TEMPLATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)denied because\s+(.+?)(?:[.!?\n]|$)",
        r"(?i)denial reason(?:\s+is|\s+was|:)\s*(.+?)(?:[.!?\n]|$)",
        r"(?i)rejected because\s+(.+?)(?:[.!?\n]|$)",
        r"(?i)reason for (?:the\s+)?denial (?:is|was)\s+(.+?)(?:[.!?\n]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("reason template must compile"))
    .collect()
});

fn contains_denial_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DENIAL_KEYWORDS.iter().any(|k| lowered.contains(k))
}

fn contains_next_step_phrase(text: &str) -> bool {
    let lowered = text.to_lowercase();
    NEXT_STEP_PHRASES.iter().any(|p| lowered.contains(p))
}

/// Extract denial reasons and next steps from a transcript.
///
/// Deterministic and idempotent: the same transcript always yields the
/// same reasons in the same order.
pub fn extract(transcript: &Transcript) -> ExtractedData {
    let rep_turns: Vec<&str> = transcript
        .turns
        .iter()
        .filter(|t| t.role == TurnRole::User)
        .map(|t| t.message.as_str())
        .collect();

    // Pass 1: whole representative turns containing a keyword.
    let mut candidates: Vec<String> = rep_turns
        .iter()
        .filter(|text| contains_denial_keyword(text))
        .map(|text| text.trim().to_string())
        .collect();

    // Pass 2: reason templates against the full transcript text.
    if candidates.is_empty() {
        let full_text: String = transcript
            .turns
            .iter()
            .map(|t| t.message.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        for template in REASON_TEMPLATES.iter() {
            for capture in template.captures_iter(&full_text) {
                if let Some(m) = capture.get(1) {
                    candidates.push(m.as_str().trim().to_string());
                }
            }
        }
    }

    // Pass 3: sentence backstop over representative turns.
    if candidates.is_empty() {
        for text in &rep_turns {
            for sentence in text.split(['.', '!', '?']) {
                let sentence = sentence.trim();
                if sentence.len() >= 20 && contains_denial_keyword(sentence) {
                    candidates.push(sentence.to_string());
                }
            }
        }
    }

    let next_steps = rep_turns
        .iter()
        .find(|text| contains_next_step_phrase(text))
        .map(|text| text.trim().to_string());

    ExtractedData { denial_reasons: dedup_preserving_order(candidates), next_steps }
}

/// Drop candidates whose normalized key was already seen, keeping the
/// first-seen form.
fn dedup_preserving_order(candidates: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.is_empty())
        .filter(|c| seen.insert(normalize_reason_key(c)))
        .collect()
}
