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

//! Fan-out of director directives to character agents
//!
//! Every directive is resolved against the caller's roster and each
//! resolved target gets its own agent run. Target runs share nothing but the
//! agent's checkpoint store, run concurrently up to a configured limit, and
//! fail independently: whatever happens to one target is recorded in its
//! [`DispatchResult`] and never reaches its siblings.

use crate::agent::{AgentError, CharacterAgent};
use crate::postprocess::{DialogueFilter, SpeechSynthesizer};
use freecity_common::ValidationStatus;
use freecity_common::action::SendToNpc;
use freecity_common::character::{
    CharacterResponse, CharacterState, Roster, RosterEntry, WorldEvent, clamp_trust,
};
use freecity_common::world::{NpcWorldContext, WorldSnapshot};
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Source recorded on events delivered by a directive
pub const DIRECTOR_SOURCE: &str = "world_director";

/// Why a target produced no agent outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchFailure {
    /// The directive named an agent missing from the roster
    TargetNotFound,
    /// A model call failed mid-run
    Gateway,
    Cancelled,
    /// The target's task panicked
    Panicked,
}

impl DispatchFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchFailure::TargetNotFound => "target_not_found",
            DispatchFailure::Gateway => "gateway",
            DispatchFailure::Cancelled => "cancelled",
            DispatchFailure::Panicked => "panicked",
        }
    }
}

/// Result of delivering one directive to one target
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub npc_id: String,
    pub event: String,
    /// Agent validation status; absent when the run did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ValidationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CharacterResponse>,
    /// Final agent state, for callers that persist it
    #[serde(skip)]
    pub state: Option<CharacterState>,
    /// Diagnostic text for failures and INVALID responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DispatchFailure>,
}

impl DispatchResult {
    fn failed(
        npc_id: impl Into<String>,
        event: impl Into<String>,
        failure: DispatchFailure,
        error: impl Into<String>,
    ) -> Self {
        Self {
            npc_id: npc_id.into(),
            event: event.into(),
            status: None,
            response: None,
            state: None,
            error: Some(error.into()),
            failure: Some(failure),
        }
    }

    /// Whether the target produced a VALID response
    pub fn is_valid(&self) -> bool {
        self.status == Some(ValidationStatus::Valid)
    }

    fn outcome_label(&self) -> &'static str {
        match (self.failure, self.status) {
            (Some(failure), _) => failure.as_str(),
            (None, Some(ValidationStatus::Valid)) => "valid",
            (None, _) => "invalid",
        }
    }
}

/// Roster entries addressed by `directive`. The `all` sentinel selects
/// every entry, narrowed by the optional type filter, in agent id order.
pub fn resolve_targets<'a>(
    directive: &SendToNpc,
    roster: &'a Roster,
) -> Vec<(&'a str, &'a RosterEntry)> {
    if directive.is_broadcast() {
        roster
            .iter()
            .filter(|(_, entry)| match directive.npc_type.as_deref() {
                Some(npc_type) => entry.npc_type == npc_type,
                None => true,
            })
            .map(|(id, entry)| (id.as_str(), entry))
            .collect()
    } else {
        roster
            .get_key_value(&directive.npc_id)
            .map(|(id, entry)| (id.as_str(), entry))
            .into_iter()
            .collect()
    }
}

/// Agent input for one target: its prior state plus the directive's event
/// as the only new event
pub fn character_state(
    npc_id: &str,
    entry: &RosterEntry,
    snapshot: &WorldSnapshot,
    event: &str,
) -> CharacterState {
    CharacterState {
        voice_id: entry.voice_id.clone(),
        memory: entry.memory.clone(),
        trust_score: clamp_trust(entry.trust_score),
        emotion: entry.emotion,
        world_state: NpcWorldContext::from_snapshot(snapshot, entry.location.as_deref()),
        recent_events: vec![WorldEvent::new(DIRECTOR_SOURCE, event, 0)],
        conversation_history: entry.conversation_history.clone(),
        ..CharacterState::new(npc_id, entry.npc_identity.clone())
    }
}

pub struct DispatchCoordinator {
    agent: Arc<CharacterAgent>,
    max_concurrency: usize,
    filter: Option<Arc<dyn DialogueFilter>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
}

impl DispatchCoordinator {
    pub fn new(agent: Arc<CharacterAgent>, max_concurrency: usize) -> Self {
        Self {
            agent,
            max_concurrency: max_concurrency.max(1),
            filter: None,
            speech: None,
        }
    }

    /// Clean VALID dialogue before it is returned or spoken
    pub fn with_filter(mut self, filter: Arc<dyn DialogueFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Deliver every directive and collect one result per resolved target,
    /// or one `TargetNotFound` result per unresolved directive. Results come
    /// back in directive order, then roster order.
    ///
    /// Each target runs under a child of `cancel`: cancelling `cancel` stops
    /// all of them, a target's own cancellation stops only that target.
    /// Dropping the returned future cancels every target it started.
    #[tracing::instrument(skip_all, fields(directives = directives.len()))]
    pub async fn dispatch(
        &self,
        directives: &[SendToNpc],
        roster: &Roster,
        snapshot: &WorldSnapshot,
        cancel: &CancellationToken,
    ) -> Vec<DispatchResult> {
        let scope = cancel.child_token();
        let _cancel_on_drop = scope.clone().drop_guard();
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut planned = Vec::new();

        for directive in directives {
            let targets = resolve_targets(directive, roster);
            if targets.is_empty() {
                tracing::warn!(npc_id = %directive.npc_id, "Directive target not found in roster");
                planned.push(Planned::Ready(DispatchResult::failed(
                    directive.npc_id.clone(),
                    directive.event.clone(),
                    DispatchFailure::TargetNotFound,
                    format!("no roster entry matches '{}'", directive.npc_id),
                )));
                continue;
            }

            for (npc_id, entry) in targets {
                let target = Target {
                    agent: self.agent.clone(),
                    filter: self.filter.clone(),
                    speech: self.speech.clone(),
                    event: directive.event.clone(),
                    state: character_state(npc_id, entry, snapshot, &directive.event),
                };
                let span = tracing::info_span!("dispatch_target", npc_id = %npc_id);
                let handle = tokio::spawn(
                    target
                        .run(permits.clone(), scope.child_token())
                        .instrument(span),
                );
                planned.push(Planned::Running {
                    npc_id: npc_id.to_string(),
                    event: directive.event.clone(),
                    handle,
                });
            }
        }

        let results = join_all(planned.into_iter().map(Planned::join)).await;
        for result in &results {
            counter!("dispatch.targets", "outcome" => result.outcome_label()).increment(1);
        }
        tracing::info!(targets = results.len(), "Dispatch complete");
        results
    }
}

enum Planned {
    Ready(DispatchResult),
    Running {
        npc_id: String,
        event: String,
        handle: tokio::task::JoinHandle<DispatchResult>,
    },
}

impl Planned {
    async fn join(self) -> DispatchResult {
        match self {
            Planned::Ready(result) => result,
            Planned::Running {
                npc_id,
                event,
                handle,
            } => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(%npc_id, error = %e, "Dispatch target task failed");
                    DispatchResult::failed(npc_id, event, DispatchFailure::Panicked, e.to_string())
                }
            },
        }
    }
}

/// One target's agent run with its post-processing
struct Target {
    agent: Arc<CharacterAgent>,
    filter: Option<Arc<dyn DialogueFilter>>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    event: String,
    state: CharacterState,
}

impl Target {
    async fn run(self, permits: Arc<Semaphore>, cancel: CancellationToken) -> DispatchResult {
        let npc_id = self.state.npc_id.clone();
        let voice_id = self.state.voice_id.clone();

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = permits.acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            return DispatchResult::failed(
                npc_id,
                self.event,
                DispatchFailure::Cancelled,
                "cancelled before the agent started",
            );
        };

        match self.agent.run(self.state, &cancel).await {
            Ok(outcome) => {
                let mut response = outcome.response;
                if let Some(response) = response.as_mut() {
                    if let Some(filter) = &self.filter {
                        response.dialogue = filter.clean(&response.dialogue);
                    }
                    if let Some(speech) = &self.speech {
                        if !response.dialogue.is_empty() {
                            response.audio_url =
                                speech.synthesize(&response.dialogue, voice_id.as_deref()).await;
                        }
                    }
                }
                DispatchResult {
                    npc_id,
                    event: self.event,
                    status: Some(outcome.status),
                    response,
                    state: Some(outcome.state),
                    error: outcome.violation.map(|violation| violation.to_string()),
                    failure: None,
                }
            }
            Err(e) => {
                let failure = match e {
                    AgentError::Cancelled(_) => DispatchFailure::Cancelled,
                    AgentError::Gateway { .. } => DispatchFailure::Gateway,
                };
                tracing::warn!(%npc_id, error = %e, "Dispatch target failed");
                DispatchResult::failed(npc_id, self.event, failure, e.to_string())
            }
        }
    }
}
