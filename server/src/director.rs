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

//! World director
//!
//! Turns a world snapshot into validated world actions, a line of narration
//! and the directives destined for character agents:
//!
//! ```text
//! normalize_input -> generate_actions -> validate_output -> dispatch_npc_actions
//!                          ^                   |
//!                          +---- INVALID ------+
//! ```
//!
//! A run never ends INVALID. After [`MAX_ATTEMPTS`] generations without a
//! valid reply the output is replaced by a neutral placeholder and the run
//! ends with [`ValidationStatus::Fallback`].

mod prompts;
mod stage;

pub use prompts::SYSTEM_PROMPT;
pub use stage::DirectorStage;

use crate::llm::{LlmMessage, ModelGateway};
use crate::schema::{ExtractError, FieldViolation, extract_json_object, validate_director_output};
use freecity_common::ValidationStatus;
use freecity_common::action::{Action, DirectorOutput, SendToNpc};
use freecity_common::world::{EventDescriptor, WorldSnapshot, WorldStateInput};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Upper bound on generations per run
pub const MAX_ATTEMPTS: u32 = 3;

/// Narration returned when every attempt failed validation
pub const FALLBACK_NARRATION: &str = "The world holds its breath, waiting.";

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("director run cancelled during {0}")]
    Cancelled(DirectorStage),
}

/// Input of one director run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorRequest {
    #[serde(default)]
    pub world_state: WorldStateInput,
    #[serde(default)]
    pub recent_events: Vec<EventDescriptor>,
}

/// Terminal result of a director run
#[derive(Debug, Clone, Serialize)]
pub struct DirectorOutcome {
    /// World actions other than directives
    pub actions: Vec<Action>,
    pub narrator: String,
    /// `send_to_npc` actions, in the order the director gave them
    pub npc_directives: Vec<SendToNpc>,
    /// VALID or FALLBACK
    pub status: ValidationStatus,
    /// Number of schema validation failures
    pub retry_count: u32,
    /// Number of model generations, including failed calls
    pub attempts: u32,
    /// Normalized input the run worked from
    pub snapshot: WorldSnapshot,
}

/// What the latest generation produced
enum Generation {
    Parsed(Value),
    Unparseable(ExtractError),
    GatewayFailed,
}

/// Mutable state of one run
struct DirectorRun {
    snapshot: WorldSnapshot,
    user_message: String,
    attempts: u32,
    retry_count: u32,
    raw_response: Option<String>,
    generation: Option<Generation>,
    validation_error: Option<String>,
    status: Option<ValidationStatus>,
    output: DirectorOutput,
    npc_directives: Vec<SendToNpc>,
}

impl DirectorRun {
    /// normalize_input: fill defaults, flatten events, compose the prompt
    fn normalize(request: DirectorRequest) -> Self {
        let snapshot = WorldSnapshot::from(request.world_state);
        let events: Vec<String> = request
            .recent_events
            .iter()
            .map(EventDescriptor::flatten)
            .collect();
        let user_message = prompts::snapshot_message(&snapshot, &events);
        Self {
            snapshot,
            user_message,
            attempts: 0,
            retry_count: 0,
            raw_response: None,
            generation: None,
            validation_error: None,
            status: None,
            output: DirectorOutput::default(),
            npc_directives: Vec::new(),
        }
    }

    /// Conversation for the next generation. After a schema failure the
    /// rejected reply and the exact error text are appended.
    fn messages(&self) -> Vec<LlmMessage> {
        let mut messages = vec![LlmMessage::user(self.user_message.clone())];
        if self.retry_count > 0 {
            if let Some(error) = &self.validation_error {
                messages.push(LlmMessage::assistant(
                    self.raw_response.clone().unwrap_or_default(),
                ));
                messages.push(LlmMessage::user(prompts::retry_message(error)));
            }
        }
        messages
    }

    fn record_reply(&mut self, raw: String) {
        self.generation = Some(match extract_json_object(&raw) {
            Ok(value) => Generation::Parsed(value),
            Err(e) => {
                tracing::debug!(error = %e, "Director reply is not a JSON object");
                Generation::Unparseable(e)
            }
        });
        self.raw_response = Some(raw);
    }

    fn record_gateway_failure(&mut self) {
        self.generation = Some(Generation::GatewayFailed);
        self.raw_response = None;
    }

    /// validate_output
    fn validate(&mut self) {
        let result = match self.generation.take() {
            Some(Generation::Parsed(value)) => validate_director_output(&value).map_err(Some),
            Some(Generation::Unparseable(e)) => {
                let empty = json!({"actions": [], "narrator": ""});
                match validate_director_output(&empty) {
                    Ok(output) => Ok(output),
                    Err(mut violation) => {
                        violation
                            .violations
                            .insert(0, FieldViolation::new("$", e.to_string()));
                        Err(Some(violation))
                    }
                }
            }
            Some(Generation::GatewayFailed) | None => Err(None),
        };

        match result {
            Ok(output) => {
                self.output = output;
                self.validation_error = None;
                self.status = Some(ValidationStatus::Valid);
            }
            Err(violation) => {
                if let Some(violation) = violation {
                    tracing::warn!(
                        attempt = self.attempts,
                        %violation,
                        "Director output failed validation"
                    );
                    counter!("director.validation_failures").increment(1);
                    self.retry_count += 1;
                    self.validation_error = Some(violation.to_string());
                } else {
                    self.validation_error = None;
                }
                self.output = DirectorOutput::default();
                self.status = Some(if self.attempts >= MAX_ATTEMPTS {
                    self.fall_back();
                    ValidationStatus::Fallback
                } else {
                    ValidationStatus::Invalid
                });
            }
        }
    }

    fn fall_back(&mut self) {
        tracing::warn!(
            attempts = self.attempts,
            retry_count = self.retry_count,
            "Director attempts exhausted, using fallback narration"
        );
        counter!("director.fallbacks").increment(1);
        self.output = DirectorOutput {
            actions: Vec::new(),
            narrator: FALLBACK_NARRATION.to_string(),
        };
    }

    /// dispatch_npc_actions: split directives from world actions
    fn dispatch(&mut self) {
        let (directives, actions): (Vec<Action>, Vec<Action>) = std::mem::take(&mut self.output.actions)
            .into_iter()
            .partition(|action| action.as_directive().is_some());
        self.npc_directives = directives
            .into_iter()
            .filter_map(|action| match action {
                Action::SendToNpc(directive) => Some(directive),
                _ => None,
            })
            .collect();
        self.output.actions = actions;
    }

    fn into_outcome(self) -> DirectorOutcome {
        DirectorOutcome {
            actions: self.output.actions,
            narrator: self.output.narrator,
            npc_directives: self.npc_directives,
            status: self.status.unwrap_or(ValidationStatus::Fallback),
            retry_count: self.retry_count,
            attempts: self.attempts,
            snapshot: self.snapshot,
        }
    }
}

pub struct WorldDirector {
    gateway: Arc<dyn ModelGateway>,
}

impl WorldDirector {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Run the director over one snapshot.
    ///
    /// Gateway failures and schema violations are absorbed by the retry
    /// loop; the only error is cancellation.
    #[tracing::instrument(skip(self, request, cancel), fields(run_id = %Uuid::new_v4()))]
    pub async fn run(
        &self,
        request: DirectorRequest,
        cancel: &CancellationToken,
    ) -> Result<DirectorOutcome, DirectorError> {
        let started = Instant::now();
        let mut stage = DirectorStage::FIRST;
        let mut run = DirectorRun::normalize(request);
        tracing::debug!(
            karma = run.snapshot.player_karma,
            tension = run.snapshot.tension_level,
            "World snapshot normalized"
        );
        stage = stage.route(run.status);

        while stage != DirectorStage::Done {
            tracing::debug!(%stage, "Entering stage");
            match stage {
                DirectorStage::NormalizeInput => {}
                DirectorStage::GenerateActions => self.generate(&mut run, cancel).await?,
                DirectorStage::ValidateOutput => run.validate(),
                DirectorStage::DispatchNpcActions => run.dispatch(),
                DirectorStage::Done => break,
            }
            stage = stage.route(run.status);
        }

        let outcome = run.into_outcome();
        histogram!("director.duration").record(started.elapsed().as_secs_f64());
        tracing::info!(
            status = %outcome.status,
            attempts = outcome.attempts,
            retry_count = outcome.retry_count,
            actions = outcome.actions.len(),
            directives = outcome.npc_directives.len(),
            "Director run complete"
        );
        Ok(outcome)
    }

    /// generate_actions
    async fn generate(
        &self,
        run: &mut DirectorRun,
        cancel: &CancellationToken,
    ) -> Result<(), DirectorError> {
        if cancel.is_cancelled() {
            return Err(DirectorError::Cancelled(DirectorStage::GenerateActions));
        }
        run.attempts += 1;
        counter!("director.attempts").increment(1);
        let messages = run.messages();
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DirectorError::Cancelled(DirectorStage::GenerateActions));
            }
            reply = self.gateway.invoke(prompts::SYSTEM_PROMPT, &messages) => reply,
        };
        match reply {
            Ok(raw) => run.record_reply(raw),
            Err(e) => {
                tracing::warn!(attempt = run.attempts, error = %e, "Director model call failed");
                run.record_gateway_failure();
            }
        }
        Ok(())
    }
}
