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

//! World snapshot types consumed by the director

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lowest karma a player can have (villain)
pub const KARMA_MIN: i32 = -100;
/// Highest karma a player can have (hero)
pub const KARMA_MAX: i32 = 100;
/// Highest global tension level
pub const TENSION_MAX: i32 = 10;

/// Summary of an NPC currently active in the world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcSummary {
    pub id: String,
    #[serde(rename = "type", default)]
    pub npc_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub mood: String,
}

/// World state as supplied by a caller. Every field is optional and is filled
/// in with a default when the director normalizes its input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStateInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_karma: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_npcs: Option<Vec<NpcSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tension_level: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_events: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_player_actions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Fully populated, immutable world snapshot for one director run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub player_karma: i32,
    pub active_npcs: Vec<NpcSummary>,
    pub weather: String,
    pub time_of_day: String,
    pub tension_level: i32,
    pub active_events: Vec<String>,
    pub recent_player_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            player_karma: 0,
            active_npcs: Vec::new(),
            weather: "clear".to_string(),
            time_of_day: "noon".to_string(),
            tension_level: 0,
            active_events: Vec::new(),
            recent_player_actions: Vec::new(),
            location: None,
        }
    }
}

impl From<WorldStateInput> for WorldSnapshot {
    /// Fill every missing field with its default. Karma and tension are
    /// clamped into their documented ranges.
    fn from(input: WorldStateInput) -> Self {
        let defaults = WorldSnapshot::default();
        Self {
            player_karma: input
                .player_karma
                .unwrap_or(defaults.player_karma)
                .clamp(KARMA_MIN, KARMA_MAX),
            active_npcs: input.active_npcs.unwrap_or(defaults.active_npcs),
            weather: input.weather.unwrap_or(defaults.weather),
            time_of_day: input.time_of_day.unwrap_or(defaults.time_of_day),
            tension_level: input
                .tension_level
                .unwrap_or(defaults.tension_level)
                .clamp(0, TENSION_MAX),
            active_events: input.active_events.unwrap_or(defaults.active_events),
            recent_player_actions: input
                .recent_player_actions
                .unwrap_or(defaults.recent_player_actions),
            location: input.location,
        }
    }
}

/// Structured recent event as reported by the game client. Only `source`
/// and `action` take part in flattening; every other field (`time`,
/// `location`, ...) is carried in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A recent event descriptor. Callers may send plain strings, structured
/// records, or anything else; everything is flattened to a single line.
/// Non-objects and objects whose `source` or `action` is not a string end up
/// in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventDescriptor {
    Text(String),
    Record(EventRecord),
    Other(Value),
}

impl EventDescriptor {
    /// Flatten into `"source: action"`, or whichever half is present, or
    /// the JSON rendering of the descriptor.
    pub fn flatten(&self) -> String {
        match self {
            EventDescriptor::Text(text) => text.clone(),
            EventDescriptor::Record(record) => {
                let source = record.source.as_deref().filter(|s| !s.is_empty());
                let action = record.action.as_deref().filter(|s| !s.is_empty());
                match (source, action) {
                    (Some(source), Some(action)) => format!("{}: {}", source, action),
                    (None, Some(action)) => action.to_string(),
                    (Some(source), None) => source.to_string(),
                    (None, None) => serde_json::to_string(record).unwrap_or_default(),
                }
            }
            EventDescriptor::Other(value) => value.to_string(),
        }
    }
}

impl From<&str> for EventDescriptor {
    fn from(text: &str) -> Self {
        EventDescriptor::Text(text.to_string())
    }
}

/// Slice of the world relevant to a single character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcWorldContext {
    pub location: String,
    pub weather: String,
    pub time_of_day: String,
    pub tension_level: i32,
}

impl Default for NpcWorldContext {
    fn default() -> Self {
        Self {
            location: "unknown".to_string(),
            weather: "clear".to_string(),
            time_of_day: "noon".to_string(),
            tension_level: 0,
        }
    }
}

impl NpcWorldContext {
    /// Build the context for an NPC standing at `location`, falling back to
    /// the player's location when the NPC has none.
    pub fn from_snapshot(snapshot: &WorldSnapshot, location: Option<&str>) -> Self {
        Self {
            location: location
                .filter(|l| !l.is_empty())
                .or(snapshot.location.as_deref())
                .unwrap_or("unknown")
                .to_string(),
            weather: snapshot.weather.clone(),
            time_of_day: snapshot.time_of_day.clone(),
            tension_level: snapshot.tension_level,
        }
    }
}
