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

//! Director output and action validation

use super::fields::{FieldChecker, kind};
use super::{FieldViolation, SchemaViolation};
use freecity_common::action::{
    ACTION_TAGS, Action, DirectorOutput, Intensity, MAX_ACTIONS, VehicleBehavior,
    WeatherCondition, WeatherTransition,
};
use serde_json::Value;

const ACTION_SCHEMA: &str = "action";
const DIRECTOR_SCHEMA: &str = "director output";

const COUNT_MAX: i64 = u32::MAX as i64;
const TENSION_LEVEL_MAX: i64 = 10;

/// Validate one action object
pub fn validate_action(value: &Value) -> Result<Action, SchemaViolation> {
    check_action("action", value).map_err(|violations| SchemaViolation::new(ACTION_SCHEMA, violations))
}

/// Validate a parsed director response.
///
/// A missing `actions` key counts as an empty list. The narrator is returned
/// trimmed.
pub fn validate_director_output(value: &Value) -> Result<DirectorOutput, SchemaViolation> {
    let Value::Object(object) = value else {
        return Err(SchemaViolation::single(
            DIRECTOR_SCHEMA,
            FieldViolation::new("$", format!("expected a JSON object, got {}", kind(value))),
        ));
    };

    let mut violations = Vec::new();
    let mut actions = Vec::new();

    match object.get("actions") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            if items.len() > MAX_ACTIONS {
                violations.push(FieldViolation::new(
                    "actions",
                    format!("too many actions ({}), maximum is {}", items.len(), MAX_ACTIONS),
                ));
            }
            for (index, item) in items.iter().enumerate() {
                match check_action(&format!("actions[{}]", index), item) {
                    Ok(action) => actions.push(action),
                    Err(mut found) => violations.append(&mut found),
                }
            }
        }
        Some(other) => violations.push(FieldViolation::new(
            "actions",
            format!("must be an array, got {}", kind(other)),
        )),
    }

    let mut checker = FieldChecker::new(object, "", "director output");
    let narrator = checker.non_empty_string("narrator").map(|text| text.trim().to_string());
    violations.extend(checker.into_violations());

    match narrator {
        Some(narrator) if violations.is_empty() => Ok(DirectorOutput { actions, narrator }),
        _ => Err(SchemaViolation::new(DIRECTOR_SCHEMA, violations)),
    }
}

fn check_action(path: &str, value: &Value) -> Result<Action, Vec<FieldViolation>> {
    let Value::Object(object) = value else {
        return Err(vec![FieldViolation::new(
            path,
            format!("expected an action object, got {}", kind(value)),
        )]);
    };

    let tag_path = format!("{}.action", path);
    let tag = match object.get("action") {
        None | Some(Value::Null) => {
            return Err(vec![FieldViolation::new(tag_path, "action is missing the 'action' field")]);
        }
        Some(Value::String(tag)) => tag.as_str(),
        Some(other) => {
            return Err(vec![FieldViolation::new(
                tag_path,
                format!("must be a string, got {}", kind(other)),
            )]);
        }
    };

    if !ACTION_TAGS.contains(&tag) {
        let mut valid: Vec<&str> = ACTION_TAGS.to_vec();
        valid.sort_unstable();
        return Err(vec![FieldViolation::new(
            tag_path,
            format!("unknown action type '{}'; valid types: [{}]", tag, valid.join(", ")),
        )]);
    }

    let mut fields = FieldChecker::new(object, path, tag);
    match tag {
        "spawn_npc" => {
            fields.required_string("npc_type");
            fields.required_string("location");
            fields.required_string("mood");
            fields.defaulted_integer("count", 0, COUNT_MAX);
        }
        "remove_npc" => {
            fields.required_string("npc_id");
            fields.optional_string("npc_type");
        }
        "change_weather" => {
            fields.required_choice("condition", WeatherCondition::VALUES);
            fields.required_choice("transition", WeatherTransition::VALUES);
        }
        "trigger_event" => {
            fields.required_string("event_name");
            fields.required_string("location");
            fields.required_choice("intensity", Intensity::VALUES);
        }
        "update_tension" => {
            fields.required_integer("level", 0, TENSION_LEVEL_MAX);
            fields.optional_integer("delta", i32::MIN.into(), i32::MAX.into());
        }
        "spawn_vehicle" => {
            fields.required_string("vehicle_type");
            fields.required_string("location");
            fields.required_choice("behavior", VehicleBehavior::VALUES);
            fields.required_integer("count", 0, COUNT_MAX);
        }
        "send_to_npc" => {
            fields.required_string("npc_id");
            fields.optional_string("npc_type");
            fields.required_string("event");
        }
        _ => {}
    }
    fields.required_string("reason");

    if !fields.is_clean() {
        return Err(fields.into_violations());
    }

    // Every field was checked above, so decoding only fails on a shape the
    // checker does not know about
    serde_json::from_value::<Action>(value.clone())
        .map_err(|e| vec![FieldViolation::new(path, e.to_string())])
}
