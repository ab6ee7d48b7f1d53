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

//! Integration tests for the character agent
//!
//! These tests verify:
//! - Keyword triggers overriding model reasoning
//! - Trust clamping at both ends of the scale
//! - Bounded memory across many runs
//! - Per-agent serialization of concurrent runs

use async_trait::async_trait;
use freecity_common::ValidationStatus;
use freecity_common::character::{
    CharacterState, ConversationEntry, Emotion, TRUST_MAX, TRUST_MIN, WorldEvent,
};
use freecity_server::agent::{AgentError, AgentStage, CharacterAgent};
use freecity_server::llm::{LlmError, LlmMessage, ModelGateway};
use freecity_server::triggers::{EmotionRule, TriggerEngine, TriggerTables};
use mockall::mock;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

mock! {
    Gateway {}

    #[async_trait]
    impl ModelGateway for Gateway {
        async fn invoke(
            &self,
            system_prompt: &str,
            messages: &[LlmMessage],
        ) -> Result<String, LlmError>;
    }
}

fn agent(reply: &'static str) -> CharacterAgent {
    let mut gateway = MockGateway::new();
    gateway
        .expect_invoke()
        .returning(move |_, _| Ok(reply.to_string()));
    CharacterAgent::new(Arc::new(gateway), Arc::new(TriggerEngine::default()))
}

fn vendor(action: &str) -> CharacterState {
    CharacterState::new("npc_001", "Marta, a fruit vendor")
        .with_event(WorldEvent::new("player", action, 0))
}

#[tokio::test]
async fn test_threat_makes_agent_angry() {
    let agent = agent("Trust should increase, +1.");
    let outcome = agent
        .run(vendor("he gave me a threat"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.status, ValidationStatus::Valid);
    assert_eq!(outcome.state.emotion, Emotion::Angry);
    assert_eq!(outcome.state.trust_score, 3);
    assert_eq!(
        outcome.state.internal_reasoning.as_deref(),
        Some("Trust should increase, +1.")
    );
    match &outcome.state.conversation_history[0] {
        ConversationEntry::Player { triggers, .. } => {
            let effect = triggers.emotion_trigger.unwrap();
            assert_eq!(effect.emotion, Emotion::Angry);
            assert_eq!(effect.trust_delta, -2);
        }
        other => panic!("expected a player entry, got {:?}", other),
    }
}

#[tokio::test]
async fn test_trust_is_clamped() {
    let agent = agent("Fine.");
    let outcome = agent
        .run(
            vendor("an attack came out of nowhere").with_trust(1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.state.trust_score, TRUST_MIN);
    assert_eq!(outcome.response.unwrap().action_trigger, "ATTACK");

    let agent = crate::agent("Fine.");
    let outcome = agent
        .run(
            vendor("a gift of fresh bread").with_trust(9),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.state.trust_score, TRUST_MAX);
}

#[tokio::test]
async fn test_model_reasoning_moves_trust_without_trigger() {
    let agent = agent("I feel my trust increase a little.");
    let outcome = agent
        .run(vendor("asked about apples"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.state.trust_score, 6);
    assert_eq!(outcome.state.emotion, Emotion::Neutral);
}

#[tokio::test]
async fn test_memory_stays_bounded_over_many_runs() {
    let agent = agent("Thank you kindly.");
    let mut memory = Default::default();
    let mut trust = 5;

    for round in 0..15 {
        let state = vendor(&format!("a gift, round {}", round))
            .with_memory(memory)
            .with_trust(trust);
        let outcome = agent.run(state, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.status, ValidationStatus::Valid);
        memory = outcome.state.memory;
        trust = outcome.state.trust_score;
    }

    assert_eq!(memory.short_term.len(), 10);
    assert_eq!(memory.relationship_history.len(), 10);
    assert!(memory.short_term[9].ends_with("a gift, round 14"));
    assert_eq!(trust, TRUST_MAX);
}

#[tokio::test]
async fn test_configured_triggers_replace_defaults() {
    let tables = TriggerTables {
        emotion: vec![EmotionRule::new("Durian", Emotion::Excited, 1)],
        action: Vec::new(),
    };
    let mut gateway = MockGateway::new();
    gateway
        .expect_invoke()
        .returning(|_, _| Ok("Oh my!".to_string()));
    let agent = CharacterAgent::new(Arc::new(gateway), Arc::new(TriggerEngine::new(tables)));

    let outcome = agent
        .run(vendor("offered a DURIAN as a gift"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.state.emotion, Emotion::Excited);
    assert_eq!(outcome.state.trust_score, 6);
    assert_eq!(outcome.response.unwrap().action_trigger, "NONE");
}

#[tokio::test]
async fn test_gateway_error_surfaces_stage() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_invoke()
        .returning(|_, _| Err(LlmError::Timeout("request exceeded 30s".to_string())));
    let agent = CharacterAgent::new(Arc::new(gateway), Arc::new(TriggerEngine::default()));

    let err = agent
        .run(vendor("waves"), &CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        AgentError::Gateway { stage, source } => {
            assert_eq!(stage, AgentStage::Perceive);
            assert!(matches!(source, LlmError::Timeout(_)));
        }
        other => panic!("unexpected error: {}", other),
    }
}

/// Gateway that tracks how many calls are in flight at once
struct CountingGateway {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ModelGateway for CountingGateway {
    async fn invoke(&self, _: &str, _: &[LlmMessage]) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("Hello.".to_string())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_agent_runs_are_serialized() {
    let gateway = Arc::new(CountingGateway {
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let agent = Arc::new(CharacterAgent::new(
        gateway.clone(),
        Arc::new(TriggerEngine::default()),
    ));

    let handles: Vec<_> = (0..4)
        .map(|round| {
            let agent = agent.clone();
            tokio::spawn(async move {
                agent
                    .run(vendor(&format!("visit {}", round)), &CancellationToken::new())
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(gateway.peak.load(Ordering::SeqCst), 1);
    let checkpoint = agent.checkpoints().load("npc_001").await.unwrap();
    assert!(checkpoint.is_complete());
    assert_eq!(checkpoint.state.conversation_history.len(), 8);
}
