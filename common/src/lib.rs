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

//! Freecity Common Types
//!
//! This crate defines the data shared between the game client and the narrative engine:
//! - World snapshot input and its normalized form
//! - The director's action vocabulary
//! - Character state, memory and agent responses

pub mod action;
pub mod character;
pub mod world;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of validating a pipeline's structured output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    /// Output accepted
    Valid,
    /// Output rejected; the director retries, the agent reports it
    Invalid,
    /// Retries exhausted; placeholder content returned as a success
    Fallback,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationStatus::Valid => write!(f, "VALID"),
            ValidationStatus::Invalid => write!(f, "INVALID"),
            ValidationStatus::Fallback => write!(f, "FALLBACK"),
        }
    }
}
