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

//! One world tick: a director run followed by dispatch of its directives

use crate::director::{DirectorError, DirectorOutcome, DirectorRequest, WorldDirector};
use crate::dispatch::{DispatchCoordinator, DispatchResult};
use freecity_common::ValidationStatus;
use freecity_common::action::{Action, SendToNpc};
use freecity_common::character::Roster;
use freecity_common::world::{EventDescriptor, WorldStateInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Input of one tick, as sent by the game client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickRequest {
    #[serde(default)]
    pub world_state: WorldStateInput,
    #[serde(default)]
    pub recent_events: Vec<EventDescriptor>,
    /// Agents directives may address, with their prior state
    #[serde(default)]
    pub active_npcs: Roster,
}

/// Everything a tick produced
#[derive(Debug, Clone, Serialize)]
pub struct TickOutcome {
    pub actions: Vec<Action>,
    pub narrator: String,
    pub npc_directives: Vec<SendToNpc>,
    pub npc_responses: Vec<DispatchResult>,
    pub validation_status: ValidationStatus,
    pub retry_count: u32,
}

pub struct NarrativeEngine {
    director: WorldDirector,
    dispatcher: DispatchCoordinator,
}

impl NarrativeEngine {
    pub fn new(director: WorldDirector, dispatcher: DispatchCoordinator) -> Self {
        Self {
            director,
            dispatcher,
        }
    }

    /// Run the director, then deliver its directives. Cancelling `cancel`
    /// stops the director and every target run it started.
    #[tracing::instrument(skip_all, fields(npcs = request.active_npcs.len()))]
    pub async fn tick(
        &self,
        request: TickRequest,
        cancel: &CancellationToken,
    ) -> Result<TickOutcome, DirectorError> {
        let TickRequest {
            world_state,
            recent_events,
            active_npcs,
        } = request;

        let DirectorOutcome {
            actions,
            narrator,
            npc_directives,
            status,
            retry_count,
            snapshot,
            ..
        } = self
            .director
            .run(
                DirectorRequest {
                    world_state,
                    recent_events,
                },
                cancel,
            )
            .await?;

        let npc_responses = if npc_directives.is_empty() {
            Vec::new()
        } else {
            self.dispatcher
                .dispatch(&npc_directives, &active_npcs, &snapshot, cancel)
                .await
        };

        Ok(TickOutcome {
            actions,
            narrator,
            npc_directives,
            npc_responses,
            validation_status: status,
            retry_count,
        })
    }
}
