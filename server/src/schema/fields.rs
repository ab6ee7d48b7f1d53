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

use super::FieldViolation;
use serde_json::{Map, Value};

/// Collects violations while checking the fields of one JSON object
pub(super) struct FieldChecker<'a> {
    object: &'a Map<String, Value>,
    path: &'a str,
    owner: &'a str,
    violations: Vec<FieldViolation>,
}

impl<'a> FieldChecker<'a> {
    /// `path` prefixes every reported field; `owner` names the record in
    /// messages, e.g. `spawn_npc`
    pub fn new(object: &'a Map<String, Value>, path: &'a str, owner: &'a str) -> Self {
        Self {
            object,
            path,
            owner,
            violations: Vec::new(),
        }
    }

    pub fn path_of(&self, field: &str) -> String {
        if self.path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", self.path, field)
        }
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path_of(field);
        self.violations.push(FieldViolation::new(path, message));
    }

    fn present(&self, field: &str) -> Option<&'a Value> {
        self.object.get(field).filter(|value| !value.is_null())
    }

    fn missing(&mut self, field: &str) {
        let message = format!("required field missing for {}", self.owner);
        self.reject(field, message);
    }

    pub fn required_string(&mut self, field: &str) -> Option<&'a str> {
        match self.present(field) {
            None => {
                self.missing(field);
                None
            }
            Some(Value::String(text)) => Some(text.as_str()),
            Some(other) => {
                self.reject(field, format!("must be a string, got {}", kind(other)));
                None
            }
        }
    }

    /// Required string that is not blank after trimming
    pub fn non_empty_string(&mut self, field: &str) -> Option<&'a str> {
        let text = self.required_string(field)?;
        if text.trim().is_empty() {
            self.reject(field, "must not be empty");
            return None;
        }
        Some(text)
    }

    /// String or null when present
    pub fn optional_string(&mut self, field: &str) -> Option<&'a str> {
        match self.present(field) {
            None => None,
            Some(Value::String(text)) => Some(text.as_str()),
            Some(other) => {
                self.reject(field, format!("must be a string, got {}", kind(other)));
                None
            }
        }
    }

    pub fn required_choice(&mut self, field: &str, allowed: &[&str]) -> Option<&'a str> {
        let value = self.required_string(field)?;
        if !allowed.contains(&value) {
            self.reject(
                field,
                format!("must be one of [{}], got '{}'", allowed.join(", "), value),
            );
            return None;
        }
        Some(value)
    }

    pub fn required_integer(&mut self, field: &str, min: i64, max: i64) -> Option<i64> {
        match self.object.get(field) {
            None | Some(Value::Null) => {
                self.missing(field);
                None
            }
            Some(value) => self.integer_in_range(field, value, min, max),
        }
    }

    /// Integer with a default: may be absent, but not null or mistyped
    pub fn defaulted_integer(&mut self, field: &str, min: i64, max: i64) -> Option<i64> {
        let value = self.object.get(field)?;
        self.integer_in_range(field, value, min, max)
    }

    /// Integer or null when present
    pub fn optional_integer(&mut self, field: &str, min: i64, max: i64) -> Option<i64> {
        let value = self.present(field)?;
        self.integer_in_range(field, value, min, max)
    }

    fn integer_in_range(&mut self, field: &str, value: &Value, min: i64, max: i64) -> Option<i64> {
        match value.as_i64() {
            Some(number) if (min..=max).contains(&number) => Some(number),
            Some(number) => {
                self.reject(
                    field,
                    format!("must be between {} and {}, got {}", min, max, number),
                );
                None
            }
            None => {
                self.reject(field, format!("must be an integer, got {}", kind(value)));
                None
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_violations(self) -> Vec<FieldViolation> {
        self.violations
    }
}

/// Short description of a JSON value's type for messages
pub(super) fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(n) if n.is_f64() => "a float",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_collects_every_problem() {
        let map = object(json!({"a": 1, "b": "x", "c": 2.5, "d": 11}));
        let mut checker = FieldChecker::new(&map, "actions[1]", "update_tension");
        assert_eq!(checker.required_string("a"), None);
        assert_eq!(checker.required_string("missing"), None);
        assert_eq!(checker.required_integer("c", 0, 10), None);
        assert_eq!(checker.required_integer("d", 0, 10), None);
        assert_eq!(checker.required_choice("b", &["y", "z"]), None);
        let violations = checker.into_violations();
        assert_eq!(violations.len(), 5);
        assert_eq!(violations[0].path, "actions[1].a");
        assert_eq!(violations[1].message, "required field missing for update_tension");
        assert_eq!(violations[2].message, "must be an integer, got a float");
        assert_eq!(violations[3].message, "must be between 0 and 10, got 11");
        assert_eq!(violations[4].message, "must be one of [y, z], got 'x'");
    }

    #[test]
    fn test_optional_fields_accept_null_and_absence() {
        let map = object(json!({"npc_type": null, "count": null}));
        let mut checker = FieldChecker::new(&map, "", "record");
        assert_eq!(checker.optional_string("npc_type"), None);
        assert_eq!(checker.optional_integer("delta", -10, 10), None);
        assert_eq!(checker.defaulted_integer("absent", 0, 10), None);
        assert!(checker.is_clean());
        // A defaulted integer that is present must be an integer
        assert_eq!(checker.defaulted_integer("count", 0, 10), None);
        assert!(!checker.is_clean());
    }
}
