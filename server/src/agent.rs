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

//! Character agent
//!
//! Turns one perceived event into an emotion/trust update, bounded memory
//! and a validated line of dialogue:
//!
//! ```text
//! perceive -> evaluate_consciousness -> update_memory -> generate_response -> validate_output
//! ```
//!
//! There is no retry. An invalid response is returned as an
//! [`AgentOutcome`] with [`ValidationStatus::Invalid`]; a gateway failure
//! aborts the run with [`AgentError::Gateway`] and leaves a checkpoint that
//! [`CharacterAgent::resume`] can continue from.

mod checkpoint;
mod pipeline;
mod prompts;
mod stage;

pub use checkpoint::{AgentCheckpoint, CheckpointGuard, CheckpointStore};
pub use pipeline::proposed_trust_delta;
pub use stage::AgentStage;

use crate::llm::{LlmError, LlmMessage, ModelGateway};
use crate::schema::SchemaViolation;
use crate::triggers::TriggerEngine;
use freecity_common::ValidationStatus;
use freecity_common::character::{
    CONTINUED_HISTORY_CAPACITY, CharacterResponse, CharacterState,
};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model call failed during {stage}: {source}")]
    Gateway {
        stage: AgentStage,
        #[source]
        source: LlmError,
    },
    #[error("agent run cancelled during {0}")]
    Cancelled(AgentStage),
}

/// Terminal result of a character agent run
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Final state, including updated memory and conversation history
    pub state: CharacterState,
    pub status: ValidationStatus,
    /// Present when `status` is VALID
    pub response: Option<CharacterResponse>,
    /// Present when `status` is INVALID
    pub violation: Option<SchemaViolation>,
}

pub struct CharacterAgent {
    gateway: Arc<dyn ModelGateway>,
    triggers: Arc<TriggerEngine>,
    checkpoints: Arc<CheckpointStore>,
}

impl CharacterAgent {
    pub fn new(gateway: Arc<dyn ModelGateway>, triggers: Arc<TriggerEngine>) -> Self {
        Self {
            gateway,
            triggers,
            checkpoints: Arc::new(CheckpointStore::new()),
        }
    }

    /// Share a checkpoint store between agents
    pub fn with_checkpoints(mut self, checkpoints: Arc<CheckpointStore>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    /// Run the full pipeline for `state`.
    ///
    /// Runs for the same agent id are serialized; a run cancelled while it
    /// waits for its turn returns without touching the checkpoint. When
    /// `state` carries no conversation history, the last
    /// [`CONTINUED_HISTORY_CAPACITY`] entries from the agent's checkpoint are
    /// continued.
    #[tracing::instrument(skip(self, state, cancel), fields(npc_id = %state.npc_id))]
    pub async fn run(
        &self,
        mut state: CharacterState,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, AgentError> {
        let mut checkpoint = self.lock(&state.npc_id, AgentStage::FIRST, cancel).await?;
        if state.conversation_history.is_empty() {
            if let Some(previous) = &*checkpoint {
                let history = &previous.state.conversation_history;
                let start = history.len().saturating_sub(CONTINUED_HISTORY_CAPACITY);
                tracing::debug!(
                    entries = history.len() - start,
                    "Continuing conversation from checkpoint"
                );
                state.conversation_history = history[start..].to_vec();
            }
        }
        self.drive(state, AgentStage::FIRST, &mut checkpoint, cancel).await
    }

    /// Continue an interrupted run from its last completed stage. Returns
    /// `None` when the agent has no interrupted run.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn resume(
        &self,
        npc_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AgentOutcome>, AgentError> {
        let mut checkpoint = self.lock(npc_id, AgentStage::FIRST, cancel).await?;
        let (state, stage) = match &*checkpoint {
            Some(saved) if !saved.is_complete() => (saved.state.clone(), saved.next_stage),
            _ => {
                tracing::debug!("No interrupted run to resume");
                return Ok(None);
            }
        };
        tracing::info!(%stage, "Resuming agent run");
        self.drive(state, stage, &mut checkpoint, cancel).await.map(Some)
    }

    async fn lock(
        &self,
        npc_id: &str,
        stage: AgentStage,
        cancel: &CancellationToken,
    ) -> Result<CheckpointGuard, AgentError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled(stage)),
            guard = self.checkpoints.lock(npc_id) => Ok(guard),
        }
    }

    async fn drive(
        &self,
        mut state: CharacterState,
        mut stage: AgentStage,
        checkpoint: &mut CheckpointGuard,
        cancel: &CancellationToken,
    ) -> Result<AgentOutcome, AgentError> {
        while stage != AgentStage::ValidateOutput && stage != AgentStage::Done {
            tracing::debug!(%stage, "Entering stage");
            if let Err(e) = self.execute(stage, &mut state, cancel).await {
                tracing::warn!(%stage, error = %e, "Agent run interrupted");
                counter!("agent.runs", "status" => "ERROR").increment(1);
                **checkpoint = Some(AgentCheckpoint::new(state, stage));
                return Err(e);
            }
            stage = stage.next();
            **checkpoint = Some(AgentCheckpoint::new(state.clone(), stage));
        }

        let (status, response, violation) = match pipeline::validate(&state) {
            Ok(response) => (ValidationStatus::Valid, Some(response), None),
            Err(violation) => {
                tracing::warn!(%violation, "Agent response failed validation");
                (ValidationStatus::Invalid, None, Some(violation))
            }
        };
        **checkpoint = Some(AgentCheckpoint::new(state.clone(), AgentStage::Done));
        counter!("agent.runs", "status" => status.to_string()).increment(1);
        tracing::info!(
            %status,
            trust = state.trust_score,
            emotion = %state.emotion,
            "Agent run complete"
        );

        Ok(AgentOutcome {
            state,
            status,
            response,
            violation,
        })
    }

    async fn execute(
        &self,
        stage: AgentStage,
        state: &mut CharacterState,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError> {
        match stage {
            AgentStage::Perceive => {
                let action = state
                    .latest_action()
                    .unwrap_or(pipeline::UNKNOWN_ACTION)
                    .to_string();
                let intent = self
                    .ask(
                        stage,
                        prompts::PERCEIVE_SYSTEM,
                        prompts::perceive_message(&state.npc_id, &action),
                        cancel,
                    )
                    .await?;
                pipeline::record_perception(state, &self.triggers, action, intent);
            }
            AgentStage::EvaluateConsciousness => {
                let (action, triggers) = pipeline::perceived(state);
                let (system, message) = pipeline::evaluate_prompt(state, &action);
                let reasoning = self.ask(stage, &system, message, cancel).await?;
                pipeline::apply_evaluation(state, &triggers, reasoning);
            }
            AgentStage::UpdateMemory => {
                let (action, _) = pipeline::perceived(state);
                pipeline::update_memory(state, &action);
            }
            AgentStage::GenerateResponse => {
                let (action, triggers) = pipeline::perceived(state);
                let system = prompts::respond_system(state, &pipeline::relationship_context(state));
                let reply = self
                    .ask(stage, &system, prompts::respond_message(&action), cancel)
                    .await?;
                pipeline::record_response(state, &triggers, reply.trim().to_string());
            }
            AgentStage::ValidateOutput | AgentStage::Done => {}
        }
        Ok(())
    }

    async fn ask(
        &self,
        stage: AgentStage,
        system: &str,
        message: String,
        cancel: &CancellationToken,
    ) -> Result<String, AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled(stage));
        }
        let messages = [LlmMessage::user(message)];
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled(stage)),
            reply = self.gateway.invoke(system, &messages) => {
                reply.map_err(|source| AgentError::Gateway { stage, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModelGateway;
    use freecity_common::character::{Emotion, WorldEvent};

    fn agent_with(gateway: MockModelGateway) -> CharacterAgent {
        CharacterAgent::new(Arc::new(gateway), Arc::new(TriggerEngine::default()))
    }

    fn replying(text: &'static str) -> MockModelGateway {
        let mut gateway = MockModelGateway::new();
        gateway
            .expect_invoke()
            .returning(move |_, _| Ok(text.to_string()));
        gateway
    }

    #[tokio::test]
    async fn test_run_makes_three_model_calls() {
        let mut gateway = MockModelGateway::new();
        gateway
            .expect_invoke()
            .times(3)
            .returning(|_, _| Ok("Well met.".to_string()));
        let agent = agent_with(gateway);

        let state = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "says hello", 0));
        let outcome = agent.run(state, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.status, ValidationStatus::Valid);
        let response = outcome.response.unwrap();
        assert_eq!(response.dialogue, "Well met.");
        assert_eq!(response.action_trigger, "NONE");
        assert_eq!(outcome.state.conversation_history.len(), 2);
    }

    #[tokio::test]
    async fn test_threat_trigger_wins_over_reasoning() {
        let agent = agent_with(replying("I trust them more now, +2 trust increase."));
        let state = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "he gave me a threat", 0));
        let outcome = agent.run(state, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.state.emotion, Emotion::Angry);
        assert_eq!(outcome.state.trust_score, 3);
        let response = outcome.response.unwrap();
        assert_eq!(response.emotion, Emotion::Angry);
        assert_eq!(response.trust_score, 3);
    }

    #[tokio::test]
    async fn test_empty_dialogue_is_invalid_without_retry() {
        let mut gateway = MockModelGateway::new();
        gateway
            .expect_invoke()
            .times(3)
            .returning(|_, _| Ok("   ".to_string()));
        let agent = agent_with(gateway);

        let state = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "stares", 0));
        let outcome = agent.run(state, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome.status, ValidationStatus::Invalid);
        assert!(outcome.response.is_none());
        assert!(outcome.violation.unwrap().mentions("dialogue"));
    }

    #[tokio::test]
    async fn test_gateway_error_aborts_and_resume_continues() {
        let mut gateway = MockModelGateway::new();
        let mut calls = 0;
        gateway.expect_invoke().times(4).returning(move |_, _| {
            calls += 1;
            match calls {
                2 => Err(LlmError::NetworkError("connection reset".to_string())),
                _ => Ok("Hello again.".to_string()),
            }
        });
        let agent = agent_with(gateway);

        let state = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "waves", 0));
        let err = agent.run(state, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Gateway {
                stage: AgentStage::EvaluateConsciousness,
                ..
            }
        ));

        let checkpoint = agent.checkpoints().load("npc_001").await.unwrap();
        assert_eq!(checkpoint.next_stage, AgentStage::EvaluateConsciousness);
        assert_eq!(checkpoint.state.conversation_history.len(), 1);

        let outcome = agent
            .resume("npc_001", &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.status, ValidationStatus::Valid);
        assert_eq!(outcome.state.conversation_history.len(), 2);

        let nothing = agent.resume("npc_001", &CancellationToken::new()).await.unwrap();
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_run() {
        let agent = agent_with(MockModelGateway::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let state = CharacterState::new("npc_001", "A vendor");
        let err = agent.run(state, &cancel).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled(AgentStage::Perceive)));
    }

    #[tokio::test]
    async fn test_conversation_continues_across_runs() {
        let agent = agent_with(replying("Back again?"));
        let first = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "buys bread", 0));
        agent.run(first, &CancellationToken::new()).await.unwrap();

        let second = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "buys milk", 1));
        let outcome = agent.run(second, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.state.conversation_history.len(), 4);
    }

    #[tokio::test]
    async fn test_continued_history_is_bounded() {
        let agent = agent_with(replying("Again?"));
        for time in 0..30 {
            let state = CharacterState::new("npc_001", "A vendor")
                .with_event(WorldEvent::new("player", "buys bread", time));
            let outcome = agent.run(state, &CancellationToken::new()).await.unwrap();
            assert!(outcome.state.conversation_history.len() <= CONTINUED_HISTORY_CAPACITY + 2);
        }

        let checkpoint = agent.checkpoints().load("npc_001").await.unwrap();
        assert_eq!(
            checkpoint.state.conversation_history.len(),
            CONTINUED_HISTORY_CAPACITY + 2
        );
    }

    #[tokio::test]
    async fn test_cancelled_while_waiting_for_same_agent() {
        let agent = agent_with(MockModelGateway::new());
        let _held = agent.checkpoints().lock("npc_001").await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let state = CharacterState::new("npc_001", "A vendor")
            .with_event(WorldEvent::new("player", "waves", 0));
        let result =
            tokio::time::timeout(std::time::Duration::from_secs(1), agent.run(state, &cancel)).await;
        assert!(matches!(
            result,
            Ok(Err(AgentError::Cancelled(AgentStage::Perceive)))
        ));
    }
}
