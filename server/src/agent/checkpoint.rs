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

//! In-memory per-agent checkpoints
//!
//! Each agent id owns its own lock. Runs for different ids never contend;
//! runs for the same id hold the write lock for their whole duration and so
//! execute one after another.

use super::stage::AgentStage;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use freecity_common::character::CharacterState;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

/// Agent state as of the last completed stage
#[derive(Debug, Clone)]
pub struct AgentCheckpoint {
    pub state: CharacterState,
    /// Stage that runs next; [`AgentStage::Done`] once a run completed
    pub next_stage: AgentStage,
    pub updated_at: DateTime<Utc>,
}

impl AgentCheckpoint {
    pub fn new(state: CharacterState, next_stage: AgentStage) -> Self {
        Self {
            state,
            next_stage,
            updated_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_stage == AgentStage::Done
    }
}

type Slot = Arc<RwLock<Option<AgentCheckpoint>>>;

/// Exclusive access to one agent's checkpoint
pub type CheckpointGuard = OwnedRwLockWriteGuard<Option<AgentCheckpoint>>;

/// Checkpoints keyed by agent id.
///
/// A slot is created the first time an agent id is seen and lives until
/// [`CheckpointStore::remove`] is called for it, completed runs included:
/// the completed checkpoint is what the agent's next run continues its
/// conversation from. Callers that retire characters remove them here.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    slots: DashMap<String, Slot>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, npc_id: &str) -> Slot {
        self.slots.entry(npc_id.to_string()).or_default().clone()
    }

    /// Snapshot of an agent's checkpoint. Waits while a run for that agent
    /// is in flight.
    pub async fn load(&self, npc_id: &str) -> Option<AgentCheckpoint> {
        let slot = self.slot(npc_id);
        let checkpoint = slot.read().await;
        checkpoint.clone()
    }

    /// Take exclusive access to an agent's checkpoint for the duration of a
    /// run
    pub async fn lock(&self, npc_id: &str) -> CheckpointGuard {
        self.slot(npc_id).write_owned().await
    }

    /// Forget an agent and free its slot. Returns whether a checkpoint
    /// existed.
    pub async fn remove(&self, npc_id: &str) -> bool {
        match self.slots.remove(npc_id) {
            Some((_, slot)) => slot.write().await.take().is_some(),
            None => false,
        }
    }

    /// Number of agents with a slot
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
