//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Stage bodies of the character agent

use super::prompts;
use crate::schema::{SchemaViolation, validate_character_response};
use crate::triggers::TriggerEngine;
use chrono::Utc;
use freecity_common::character::{
    CharacterResponse, CharacterState, ConversationEntry, Emotion, NO_ACTION, TRUST_NEUTRAL,
    TriggerMatch, clamp_trust,
};
use serde_json::json;

/// Action text used when a run starts without any event
pub const UNKNOWN_ACTION: &str = "unknown";

/// Number of recent world events shown to the model while evaluating
pub const EVALUATED_EVENTS: usize = 3;

/// Number of relationship entries shown to the model while responding
pub const PROMPTED_RELATIONSHIP_ENTRIES: usize = 3;

/// The perceived event the rest of the run reacts to: the newest player
/// entry in the conversation history
pub(super) fn perceived(state: &CharacterState) -> (String, TriggerMatch) {
    state
        .conversation_history
        .iter()
        .rev()
        .find_map(|entry| match entry {
            ConversationEntry::Player {
                action, triggers, ..
            } => Some((action.clone(), triggers.clone())),
            ConversationEntry::Npc { .. } => None,
        })
        .unwrap_or_else(|| {
            (
                state.latest_action().unwrap_or(UNKNOWN_ACTION).to_string(),
                TriggerMatch::default(),
            )
        })
}

/// Record the perceived event with its extracted intent and triggers
pub(super) fn record_perception(
    state: &mut CharacterState,
    triggers: &TriggerEngine,
    action: String,
    perceived_intent: String,
) {
    let matched = triggers.evaluate(&action);
    state.conversation_history.push(ConversationEntry::Player {
        action,
        perceived_intent,
        triggers: matched,
        timestamp: Utc::now(),
    });
}

/// Trust change the model's reasoning suggests: +1, -1 or 0. Only reasoning
/// that talks about trust counts.
pub fn proposed_trust_delta(reasoning: &str) -> i32 {
    let lower = reasoning.to_lowercase();
    if !lower.contains("trust") {
        return 0;
    }
    if reasoning.contains("+1") || reasoning.contains("+2") || lower.contains("increase") {
        1
    } else if reasoning.contains("-1") || reasoning.contains("-2") || lower.contains("decrease") {
        -1
    } else {
        0
    }
}

/// Actions of the most recent world events, comma separated
pub(super) fn recent_event_summary(state: &CharacterState) -> String {
    let start = state.recent_events.len().saturating_sub(EVALUATED_EVENTS);
    state.recent_events[start..]
        .iter()
        .map(|event| event.action.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Apply the evaluation. A trigger match replaces the model's conclusion
/// entirely; the reasoning text is kept either way.
pub(super) fn apply_evaluation(state: &mut CharacterState, triggers: &TriggerMatch, reasoning: String) {
    let (emotion, delta) = match triggers.emotion_trigger {
        Some(effect) => (effect.emotion, effect.trust_delta),
        None => (state.emotion, proposed_trust_delta(&reasoning)),
    };
    state.emotion = emotion;
    state.trust_score = clamp_trust(state.trust_score.saturating_add(delta));
    state.internal_reasoning = Some(reasoning);
}

pub(super) fn update_memory(state: &mut CharacterState, action: &str) {
    let trust = state.trust_score;
    let emotion = state.emotion;
    state
        .memory
        .remember_short_term(format!("[Trust: {}/10] {}", trust, action));
    if emotion != Emotion::Neutral || trust != TRUST_NEUTRAL {
        state.memory.remember_relationship(format!(
            "Action: {} | Emotion: {} | Trust: {}/10",
            action, emotion, trust
        ));
    }
}

pub(super) fn record_response(state: &mut CharacterState, triggers: &TriggerMatch, dialogue: String) {
    state.action_trigger = Some(
        triggers
            .action_trigger
            .clone()
            .unwrap_or_else(|| NO_ACTION.to_string()),
    );
    state.conversation_history.push(ConversationEntry::Npc {
        dialogue: dialogue.clone(),
        emotion: state.emotion,
        trust_score: state.trust_score,
        timestamp: Utc::now(),
    });
    state.dialogue = Some(dialogue);
}

/// Check the assembled response against the character response schema
pub(super) fn validate(state: &CharacterState) -> Result<CharacterResponse, SchemaViolation> {
    let payload = json!({
        "dialogue": state.dialogue.as_deref().unwrap_or_default(),
        "emotion": state.emotion,
        "trust_score": state.trust_score,
        "action_trigger": state.action_trigger.as_deref().unwrap_or(NO_ACTION),
        "audio_url": null,
    });
    validate_character_response(&payload)
}

pub(super) fn relationship_context(state: &CharacterState) -> Vec<String> {
    state
        .memory
        .recent_relationship(PROMPTED_RELATIONSHIP_ENTRIES)
        .to_vec()
}

pub(super) fn evaluate_prompt(state: &CharacterState, action: &str) -> (String, String) {
    (
        prompts::evaluate_system(state),
        prompts::evaluate_message(
            action,
            &recent_event_summary(state),
            &state.memory.long_term_summary,
        ),
    )
}
