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

//! Prompt text for the character agent

use freecity_common::character::{CharacterState, TRUST_MAX};

pub const PERCEIVE_SYSTEM: &str = "You are reading what just happened to a character in a game world. \
Describe the intent behind it, its emotional undertone and any detail that matters. \
Be brief and stick to what is actually happening.";

pub fn perceive_message(npc_id: &str, action: &str) -> String {
    format!(
        "Player input: {}\nContext: character {} is taking this in.",
        action, npc_id
    )
}

pub fn evaluate_system(state: &CharacterState) -> String {
    format!(
        "You are the inner voice of a character in a game.\n\
         Decide how the latest event changes your trust and your feelings.\n\n\
         Persona: {persona}\n\
         Trust score: {trust}/{max}\n\
         Current emotion: {emotion}\n\n\
         Think it through:\n\
         1. Does this raise or lower trust, and by how much (0 to +/-2)?\n\
         2. What do you feel now?\n\
         3. Why?\n\n\
         Answer with your private thoughts, in character.",
        persona = state.npc_identity,
        trust = state.trust_score,
        max = TRUST_MAX,
        emotion = state.emotion,
    )
}

pub fn evaluate_message(action: &str, recent_events: &str, long_term: &str) -> String {
    format!(
        "Event: {}\nRecent events: {}\nWhat you remember: {}",
        action,
        if recent_events.is_empty() { "none" } else { recent_events },
        if long_term.is_empty() { "nothing yet" } else { long_term },
    )
}

pub fn respond_system(state: &CharacterState, relationship: &[String]) -> String {
    let history = if relationship.is_empty() {
        "none yet".to_string()
    } else {
        relationship.join("\n")
    };
    format!(
        "You are a character in a game with your own personality and history.\n\n\
         Identity: {persona}\n\
         Trust score: {trust}/{max}\n\
         Current emotion: {emotion}\n\
         Setting: {location}, {weather}, {time}, tension {tension}/10\n\
         Recent history with the player:\n{history}\n\n\
         Reply in character, in one or two sentences of spoken dialogue. \
         Let your emotion and trust colour the tone.",
        persona = state.npc_identity,
        trust = state.trust_score,
        max = TRUST_MAX,
        emotion = state.emotion,
        location = state.world_state.location,
        weather = state.world_state.weather,
        time = state.world_state.time_of_day,
        tension = state.world_state.tension_level,
        history = history,
    )
}

pub fn respond_message(action: &str) -> String {
    format!("The player just: {}", action)
}
