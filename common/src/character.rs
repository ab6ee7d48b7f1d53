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

//! Shared character types: emotion, trust, memory and agent responses

use crate::world::NpcWorldContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lowest trust score
pub const TRUST_MIN: i32 = 0;
/// Highest trust score
pub const TRUST_MAX: i32 = 10;
/// Trust score of a character with no opinion of the player
pub const TRUST_NEUTRAL: i32 = 5;
/// Capacity of the short-term memory log
pub const SHORT_TERM_CAPACITY: usize = 10;
/// Capacity of the relationship history log
pub const RELATIONSHIP_CAPACITY: usize = 10;
/// Conversation entries carried from one run into the next for the same
/// agent (a player entry and a reply per exchange)
pub const CONTINUED_HISTORY_CAPACITY: usize = 20;
/// Action trigger label used when no action trigger matched
pub const NO_ACTION: &str = "NONE";

/// Character emotion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Emotion {
    Angry,
    Happy,
    #[default]
    Neutral,
    Suspicious,
    Grateful,
    Sad,
    Confused,
    Excited,
}

impl Emotion {
    pub const ALL: [Emotion; 8] = [
        Emotion::Angry,
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Suspicious,
        Emotion::Grateful,
        Emotion::Sad,
        Emotion::Confused,
        Emotion::Excited,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "ANGRY",
            Emotion::Happy => "HAPPY",
            Emotion::Neutral => "NEUTRAL",
            Emotion::Suspicious => "SUSPICIOUS",
            Emotion::Grateful => "GRATEFUL",
            Emotion::Sad => "SAD",
            Emotion::Confused => "CONFUSED",
            Emotion::Excited => "EXCITED",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == upper)
            .ok_or_else(|| format!("Unknown emotion: {}", s))
    }
}

/// Clamp a trust score into `[TRUST_MIN, TRUST_MAX]`
pub fn clamp_trust(score: i32) -> i32 {
    score.clamp(TRUST_MIN, TRUST_MAX)
}

/// Character memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMemory {
    /// Recent, trust-annotated interactions (bounded)
    #[serde(default)]
    pub short_term: Vec<String>,
    /// Opaque long-term summary carried through unchanged
    #[serde(default)]
    pub long_term_summary: String,
    /// Interactions that moved emotion or trust away from neutral (bounded)
    #[serde(default)]
    pub relationship_history: Vec<String>,
}

impl CharacterMemory {
    pub fn remember_short_term(&mut self, entry: impl Into<String>) {
        push_bounded(&mut self.short_term, entry.into(), SHORT_TERM_CAPACITY);
    }

    pub fn remember_relationship(&mut self, entry: impl Into<String>) {
        push_bounded(
            &mut self.relationship_history,
            entry.into(),
            RELATIONSHIP_CAPACITY,
        );
    }

    /// The last `count` relationship history entries, oldest first
    pub fn recent_relationship(&self, count: usize) -> &[String] {
        let start = self.relationship_history.len().saturating_sub(count);
        &self.relationship_history[start..]
    }
}

/// Append and keep only the newest `capacity` entries
fn push_bounded(log: &mut Vec<String>, entry: String, capacity: usize) {
    log.push(entry);
    if log.len() > capacity {
        let excess = log.len() - capacity;
        log.drain(..excess);
    }
}

/// An event perceived by a character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldEvent {
    pub source: String,
    pub action: String,
    #[serde(default)]
    pub time: i64,
}

impl WorldEvent {
    pub fn new(source: impl Into<String>, action: impl Into<String>, time: i64) -> Self {
        Self {
            source: source.into(),
            action: action.into(),
            time,
        }
    }
}

/// Emotion and trust change dictated by a trigger keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionEffect {
    pub emotion: Emotion,
    pub trust_delta: i32,
}

/// Deterministic trigger results for one piece of text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerMatch {
    pub emotion_trigger: Option<EmotionEffect>,
    pub action_trigger: Option<String>,
}

/// One entry of a character's conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationEntry {
    /// Something the character perceived
    Player {
        action: String,
        perceived_intent: String,
        triggers: TriggerMatch,
        timestamp: DateTime<Utc>,
    },
    /// Something the character said
    Npc {
        dialogue: String,
        emotion: Emotion,
        trust_score: i32,
        timestamp: DateTime<Utc>,
    },
}

/// Complete state of one character for one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub npc_id: String,
    /// Persona description
    pub npc_identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub memory: CharacterMemory,
    pub trust_score: i32,
    #[serde(default)]
    pub emotion: Emotion,
    #[serde(default)]
    pub world_state: NpcWorldContext,
    #[serde(default)]
    pub recent_events: Vec<WorldEvent>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_trigger: Option<String>,
}

impl CharacterState {
    /// Create a neutral character with an empty memory
    pub fn new(npc_id: impl Into<String>, npc_identity: impl Into<String>) -> Self {
        Self {
            npc_id: npc_id.into(),
            npc_identity: npc_identity.into(),
            voice_id: None,
            memory: CharacterMemory::default(),
            trust_score: TRUST_NEUTRAL,
            emotion: Emotion::Neutral,
            world_state: NpcWorldContext::default(),
            recent_events: Vec::new(),
            conversation_history: Vec::new(),
            internal_reasoning: None,
            dialogue: None,
            action_trigger: None,
        }
    }

    pub fn with_event(mut self, event: WorldEvent) -> Self {
        self.recent_events.push(event);
        self
    }

    pub fn with_memory(mut self, memory: CharacterMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_trust(mut self, trust_score: i32) -> Self {
        self.trust_score = trust_score;
        self
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = emotion;
        self
    }

    /// Action text of the newest event, if any
    pub fn latest_action(&self) -> Option<&str> {
        self.recent_events.last().map(|e| e.action.as_str())
    }
}

/// Validated output of a character agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterResponse {
    pub dialogue: String,
    pub emotion: Emotion,
    pub trust_score: i32,
    #[serde(default = "default_action_trigger")]
    pub action_trigger: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}

fn default_action_trigger() -> String {
    NO_ACTION.to_string()
}

/// Caller-supplied prior state of one roster member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(alias = "persona", default = "default_persona")]
    pub npc_identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub memory: CharacterMemory,
    #[serde(default = "default_trust")]
    pub trust_score: i32,
    #[serde(default)]
    pub emotion: Emotion,
    #[serde(rename = "type", default)]
    pub npc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationEntry>,
}

fn default_persona() -> String {
    "A generic NPC".to_string()
}

fn default_trust() -> i32 {
    TRUST_NEUTRAL
}

impl RosterEntry {
    pub fn new(npc_identity: impl Into<String>, npc_type: impl Into<String>) -> Self {
        Self {
            npc_identity: npc_identity.into(),
            voice_id: None,
            memory: CharacterMemory::default(),
            trust_score: TRUST_NEUTRAL,
            emotion: Emotion::Neutral,
            npc_type: npc_type.into(),
            location: None,
            conversation_history: Vec::new(),
        }
    }
}

/// Agents addressable by the dispatch coordinator, keyed by agent id
pub type Roster = BTreeMap<String, RosterEntry>;
