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

use super::fields::{FieldChecker, kind};
use super::{FieldViolation, SchemaViolation};
use freecity_common::character::{CharacterResponse, Emotion, NO_ACTION, TRUST_MAX, TRUST_MIN};
use serde_json::Value;

const RESPONSE_SCHEMA: &str = "character response";

/// Validate a character agent response
pub fn validate_character_response(value: &Value) -> Result<CharacterResponse, SchemaViolation> {
    let Value::Object(object) = value else {
        return Err(SchemaViolation::single(
            RESPONSE_SCHEMA,
            FieldViolation::new("$", format!("expected a JSON object, got {}", kind(value))),
        ));
    };

    let labels = Emotion::ALL.map(|emotion| emotion.as_str());
    let mut fields = FieldChecker::new(object, "", "character response");
    let dialogue = fields.non_empty_string("dialogue");
    let emotion = fields
        .required_choice("emotion", &labels)
        .and_then(|label| label.parse::<Emotion>().ok());
    let trust_score = fields.required_integer("trust_score", TRUST_MIN.into(), TRUST_MAX.into());
    let action_trigger = fields.optional_string("action_trigger");
    let audio_url = fields.optional_string("audio_url");

    match (dialogue, emotion, trust_score) {
        (Some(dialogue), Some(emotion), Some(trust_score)) if fields.is_clean() => {
            Ok(CharacterResponse {
                dialogue: dialogue.to_string(),
                emotion,
                trust_score: trust_score as i32,
                action_trigger: action_trigger.unwrap_or(NO_ACTION).to_string(),
                audio_url: audio_url.map(str::to_string),
            })
        }
        _ => Err(SchemaViolation::new(RESPONSE_SCHEMA, fields.into_violations())),
    }
}
