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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of a character agent run. The chain is strictly linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStage {
    Perceive,
    EvaluateConsciousness,
    UpdateMemory,
    GenerateResponse,
    ValidateOutput,
    Done,
}

impl AgentStage {
    pub const FIRST: AgentStage = AgentStage::Perceive;

    pub fn next(self) -> AgentStage {
        match self {
            AgentStage::Perceive => AgentStage::EvaluateConsciousness,
            AgentStage::EvaluateConsciousness => AgentStage::UpdateMemory,
            AgentStage::UpdateMemory => AgentStage::GenerateResponse,
            AgentStage::GenerateResponse => AgentStage::ValidateOutput,
            AgentStage::ValidateOutput | AgentStage::Done => AgentStage::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStage::Perceive => "perceive",
            AgentStage::EvaluateConsciousness => "evaluate_consciousness",
            AgentStage::UpdateMemory => "update_memory",
            AgentStage::GenerateResponse => "generate_response",
            AgentStage::ValidateOutput => "validate_output",
            AgentStage::Done => "done",
        }
    }
}

impl fmt::Display for AgentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_linear_and_terminates() {
        let mut stage = AgentStage::FIRST;
        let mut visited = vec![stage];
        while stage != AgentStage::Done {
            stage = stage.next();
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                AgentStage::Perceive,
                AgentStage::EvaluateConsciousness,
                AgentStage::UpdateMemory,
                AgentStage::GenerateResponse,
                AgentStage::ValidateOutput,
                AgentStage::Done,
            ]
        );
        assert_eq!(AgentStage::Done.next(), AgentStage::Done);
    }
}
