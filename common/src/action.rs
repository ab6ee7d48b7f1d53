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

//! World-mutating actions emitted by the director
//!
//! The wire form is a JSON object tagged by its `action` field:
//!
//! ```json
//! {"action": "change_weather", "condition": "fog", "transition": "gradual", "reason": "..."}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of actions a single director response may carry
pub const MAX_ACTIONS: usize = 5;

/// Sentinel npc id addressing every matching roster entry
pub const ALL_NPCS: &str = "all";

/// Every action tag the director may emit, in documentation order
pub const ACTION_TAGS: [&str; 7] = [
    "spawn_npc",
    "remove_npc",
    "change_weather",
    "trigger_event",
    "update_tension",
    "spawn_vehicle",
    "send_to_npc",
];

/// A world-mutating action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    SpawnNpc(SpawnNpc),
    RemoveNpc(RemoveNpc),
    ChangeWeather(ChangeWeather),
    TriggerEvent(TriggerEvent),
    UpdateTension(UpdateTension),
    SpawnVehicle(SpawnVehicle),
    SendToNpc(SendToNpc),
}

impl Action {
    /// Wire tag of this action
    pub fn tag(&self) -> &'static str {
        match self {
            Action::SpawnNpc(_) => "spawn_npc",
            Action::RemoveNpc(_) => "remove_npc",
            Action::ChangeWeather(_) => "change_weather",
            Action::TriggerEvent(_) => "trigger_event",
            Action::UpdateTension(_) => "update_tension",
            Action::SpawnVehicle(_) => "spawn_vehicle",
            Action::SendToNpc(_) => "send_to_npc",
        }
    }

    /// Internal reason given by the director
    pub fn reason(&self) -> &str {
        match self {
            Action::SpawnNpc(a) => &a.reason,
            Action::RemoveNpc(a) => &a.reason,
            Action::ChangeWeather(a) => &a.reason,
            Action::TriggerEvent(a) => &a.reason,
            Action::UpdateTension(a) => &a.reason,
            Action::SpawnVehicle(a) => &a.reason,
            Action::SendToNpc(a) => &a.reason,
        }
    }

    pub fn as_directive(&self) -> Option<&SendToNpc> {
        match self {
            Action::SendToNpc(directive) => Some(directive),
            _ => None,
        }
    }
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnNpc {
    pub npc_type: String,
    pub location: String,
    pub mood: String,
    #[serde(default = "default_count")]
    pub count: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveNpc {
    pub npc_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_type: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeWeather {
    pub condition: WeatherCondition,
    pub transition: WeatherTransition,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub event_name: String,
    pub location: String,
    pub intensity: Intensity,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTension {
    pub level: u8,
    /// Informational hint of the change amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i32>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnVehicle {
    pub vehicle_type: String,
    pub location: String,
    pub behavior: VehicleBehavior,
    pub count: u32,
    pub reason: String,
}

/// A directive for character agents. `event` describes what the NPC
/// perceives; it is never a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendToNpc {
    pub npc_id: String,
    /// Type filter, only meaningful when `npc_id` is [`ALL_NPCS`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_type: Option<String>,
    pub event: String,
    pub reason: String,
}

impl SendToNpc {
    pub fn is_broadcast(&self) -> bool {
        self.npc_id == ALL_NPCS
    }
}

/// Validated director response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorOutput {
    /// At most [`MAX_ACTIONS`] actions, in the order the director gave them
    pub actions: Vec<Action>,
    /// One-sentence narration, trimmed and non-empty
    pub narrator: String,
}

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Accepted wire values
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Weather conditions the world can transition to
    WeatherCondition {
        Clear => "clear",
        Cloudy => "cloudy",
        Rain => "rain",
        HeavyRain => "heavy_rain",
        Fog => "fog",
        Thunderstorm => "thunderstorm",
        Blizzard => "blizzard",
        Heatwave => "heatwave",
    }
);

wire_enum!(
    WeatherTransition {
        Instant => "instant",
        Gradual => "gradual",
    }
);

wire_enum!(
    Intensity {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

wire_enum!(
    VehicleBehavior {
        Parked => "parked",
        Patrolling => "patrolling",
        Fleeing => "fleeing",
        Chasing => "chasing",
    }
);
