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

use freecity_common::ValidationStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a world director run.
///
/// The only cycle is `ValidateOutput -> GenerateActions`, taken while the
/// output is INVALID; the run loop bounds it by attempt count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorStage {
    NormalizeInput,
    GenerateActions,
    ValidateOutput,
    DispatchNpcActions,
    Done,
}

impl DirectorStage {
    pub const FIRST: DirectorStage = DirectorStage::NormalizeInput;

    /// Stage following `self`. `status` is only consulted after
    /// validation; a missing status there counts as INVALID.
    pub fn route(self, status: Option<ValidationStatus>) -> DirectorStage {
        match self {
            DirectorStage::NormalizeInput => DirectorStage::GenerateActions,
            DirectorStage::GenerateActions => DirectorStage::ValidateOutput,
            DirectorStage::ValidateOutput => match status {
                Some(ValidationStatus::Valid) | Some(ValidationStatus::Fallback) => {
                    DirectorStage::DispatchNpcActions
                }
                Some(ValidationStatus::Invalid) | None => DirectorStage::GenerateActions,
            },
            DirectorStage::DispatchNpcActions | DirectorStage::Done => DirectorStage::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectorStage::NormalizeInput => "normalize_input",
            DirectorStage::GenerateActions => "generate_actions",
            DirectorStage::ValidateOutput => "validate_output",
            DirectorStage::DispatchNpcActions => "dispatch_npc_actions",
            DirectorStage::Done => "done",
        }
    }
}

impl fmt::Display for DirectorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
