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

//! Recover a JSON object from free-form model text

use serde_json::Value;
use thiserror::Error;

const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("model response is empty")]
    Empty,
    #[error("no JSON object found in model response: {preview}")]
    NoObject { preview: String },
}

/// Parse a model response into a JSON object.
///
/// Accepts a bare object, an object inside a ```` ``` ```` or ```` ```json ````
/// fence, and an object surrounded by prose. For the latter the first
/// balanced `{...}` span that parses is used; braces inside string literals
/// do not count towards balance.
pub fn extract_json_object(raw: &str) -> Result<Value, ExtractError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ExtractError::Empty);
    }

    let text = strip_fence(text);
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    for (start, _) in text.match_indices('{') {
        if let Some(end) = balanced_end(&text[start..]) {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&text[start..start + end]) {
                return Ok(value);
            }
        }
    }

    Err(ExtractError::NoObject {
        preview: text.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// Remove a surrounding code fence, if the whole text is one
fn strip_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    // Drop the language tag on the opening line, e.g. ```json
    let inner = match inner.find('\n') {
        Some(newline) if !inner[..newline].trim_start().starts_with('{') => &inner[newline + 1..],
        _ => inner,
    };
    inner.trim()
}

/// Byte length of the balanced object starting at `text[0] == '{'`
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
