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

//! Prompt text for the world director

use freecity_common::action::{ACTION_TAGS, MAX_ACTIONS};
use freecity_common::world::WorldSnapshot;
use serde_json::json;

/// Instruction sent with every director request
pub const SYSTEM_PROMPT: &str = r#"You direct a living open-world city game from behind the scenes.
Each turn you read the state of the world and decide what happens next so the city feels reactive and alive.

INPUT
You receive a JSON object with two keys.
"world_state":
  player_karma           integer, -100 (villain) to +100 (hero); 0 means the world has no opinion yet
  active_npcs            list of {id, type, location, mood}; use these ids for send_to_npc
  weather                current weather
  time_of_day            e.g. "dawn", "noon", "midnight"
  tension_level          integer 0 (calm) to 10 (chaos)
  active_events          ongoing event names
  recent_player_actions  what the player did lately
  location               optional, the player's current area
"recent_events": short descriptions such as "player: I brought you a gift".

KARMA
Let karma steer everything.
  +75 to +100  hero: allies appear, rescues happen, hostiles leave, weather improves, tension falls
  +25 to +74   good: small lucky breaks and helpful bystanders, tension stays low
  -24 to +24   neutral: the city goes about its business with some random flavour
  -25 to -74   bad: hostile NPCs, darker weather, rising tension, civilians flee
  -75 to -100  villain: bounty hunters, police chases, severe weather, lockdowns
NPCs who would notice the player's deeds should hear about them through send_to_npc.

ACTIONS
Use the exact action name and every required field.
  spawn_npc       npc_type, location, mood, count (integer, default 1), reason
  remove_npc      npc_id ("all" together with npc_type removes by type), npc_type (optional), reason
  change_weather  condition (clear | cloudy | rain | heavy_rain | fog | thunderstorm | blizzard | heatwave),
                  transition (instant | gradual), reason
  trigger_event   event_name (e.g. bank_robbery, street_festival, car_chase, blackout, rescue_mission),
                  location, intensity (low | medium | high), reason
  update_tension  level (integer 0-10), delta (optional integer hint), reason
  spawn_vehicle   vehicle_type, location, behavior (parked | patrolling | fleeing | chasing), count (integer), reason
  send_to_npc     npc_id (an id from active_npcs, or "all" with an optional npc_type), event, reason
For send_to_npc, "event" describes what the character witnesses or experiences, never what it should do.
  Good: "A stranger threatened you and drew a knife"
  Bad:  "become aggressive"
The "reason" field is internal and never shown to the player.

RESPONSE
Reply with a single JSON object and nothing else: no prose, no markdown fences.
{
  "actions": [{"action": "<name>", ...fields}],
  "narrator": "<one cinematic present-tense sentence of 15 to 40 words>"
}
- "actions" may be empty when nothing needs to change, and holds at most 5 entries.
- "narrator" must reflect karma and current events and must not mention reasons.

EXAMPLE
Input: player_karma=82, tension_level=2, weather="clear", recent_player_actions=["rescued_hostage"]
Output:
{"actions": [
  {"action": "spawn_npc", "npc_type": "ally", "location": "downtown", "mood": "friendly", "count": 2, "reason": "reward the hero"},
  {"action": "update_tension", "level": 1, "reason": "the hero keeps the peace"}],
 "narrator": "Music spills into the streets as strangers nod in gratitude, and the whole city seems to lean toward the light."}"#;

/// Model-facing payload for one snapshot
pub fn snapshot_message(snapshot: &WorldSnapshot, recent_events: &[String]) -> String {
    let payload = json!({
        "world_state": snapshot,
        "recent_events": recent_events,
    });
    let rendered = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    format!(
        "Current world snapshot:\n{}\n\nDirector, what happens next?",
        rendered
    )
}

/// Correction request sent after the previous reply failed validation
pub fn retry_message(validation_error: &str) -> String {
    format!(
        "Your previous reply was rejected. Fix these problems and answer again.\n\n\
         Problems:\n{error}\n\n\
         Reminder:\n\
         - Reply with one JSON object only, without markdown fences.\n\
         - Top-level keys are \"actions\" (array) and \"narrator\" (string).\n\
         - Every action needs an \"action\" field set to one of: {tags}.\n\
         - Every action needs all of its required fields.\n\
         - At most {max} actions.\n\
         - \"narrator\" must not be empty.",
        error = validation_error,
        tags = ACTION_TAGS.join(", "),
        max = MAX_ACTIONS,
    )
}
