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

//! Structured-output validation
//!
//! Validators are pure functions from an untyped JSON value to a typed
//! value. They never stop at the first problem: every offending field is
//! reported in one [`SchemaViolation`], which is what the director feeds back
//! to the model on a retry.

mod actions;
mod extract;
mod fields;
mod response;

pub use actions::{validate_action, validate_director_output};
pub use extract::{ExtractError, extract_json_object};
pub use response::validate_character_response;

use std::fmt;

/// One rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Location of the field, e.g. `actions[2].condition`
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A payload rejected by a validator, with every problem found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Name of the schema that rejected the payload
    pub schema: &'static str,
    pub violations: Vec<FieldViolation>,
}

impl SchemaViolation {
    pub fn new(schema: &'static str, violations: Vec<FieldViolation>) -> Self {
        Self { schema, violations }
    }

    pub fn single(schema: &'static str, violation: FieldViolation) -> Self {
        Self::new(schema, vec![violation])
    }

    /// Whether any violation concerns `path` or one of its children
    pub fn mentions(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path.starts_with(path))
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed:", self.schema)?;
        for violation in &self.violations {
            write!(f, "\n- {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaViolation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_renders_every_field() {
        let violation = SchemaViolation::new(
            "director output",
            vec![
                FieldViolation::new("actions[0].condition", "must be one of [clear, fog]"),
                FieldViolation::new("narrator", "must not be empty"),
            ],
        );
        assert_eq!(
            violation.to_string(),
            "director output validation failed:\n- actions[0].condition: must be one of [clear, fog]\n- narrator: must not be empty"
        );
        assert!(violation.mentions("actions[0]"));
        assert!(!violation.mentions("actions[1]"));
    }
}
