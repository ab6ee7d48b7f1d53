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

//! Integration tests for the world director
//!
//! These tests drive a complete director run against a scripted model and
//! verify:
//! - Action count and tag closure of every returned result
//! - Bounded retries ending in FALLBACK
//! - Correction framing on retries
//! - Cancellation of an in-flight model call

use async_trait::async_trait;
use freecity_common::ValidationStatus;
use freecity_common::action::{ACTION_TAGS, MAX_ACTIONS};
use freecity_common::world::WorldStateInput;
use freecity_server::director::{
    DirectorError, DirectorRequest, DirectorStage, FALLBACK_NARRATION, MAX_ATTEMPTS, WorldDirector,
};
use freecity_server::llm::{LlmError, LlmMessage, LlmRole, ModelGateway};
use mockall::mock;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
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

/// Gateway that replies with each scripted answer in turn
fn scripted(replies: Vec<String>) -> MockGateway {
    let mut replies = replies.into_iter();
    let mut gateway = MockGateway::new();
    gateway.expect_invoke().returning(move |_, _| {
        replies
            .next()
            .ok_or_else(|| LlmError::Other("no more scripted replies".to_string()))
    });
    gateway
}

fn tension(level: u8) -> serde_json::Value {
    json!({"action": "update_tension", "level": level, "reason": "test"})
}

fn reply(actions: Vec<serde_json::Value>, narrator: &str) -> String {
    json!({"actions": actions, "narrator": narrator}).to_string()
}

fn request() -> DirectorRequest {
    DirectorRequest {
        world_state: WorldStateInput {
            player_karma: Some(-88),
            tension_level: Some(8),
            weather: Some("heavy_rain".to_string()),
            ..WorldStateInput::default()
        },
        recent_events: vec!["player: attacked a civilian".into()],
    }
}

#[tokio::test]
async fn test_too_many_actions_is_retried() {
    let six = (0..6).map(tension).collect();
    let five = (0..5).map(tension).collect();
    let director = WorldDirector::new(Arc::new(scripted(vec![
        reply(six, "Chaos."),
        reply(five, "Sirens tear through the storm."),
    ])));

    let outcome = director
        .run(request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, ValidationStatus::Valid);
    assert_eq!(outcome.retry_count, 1);
    assert_eq!(outcome.actions.len(), MAX_ACTIONS);
    assert_eq!(outcome.snapshot.player_karma, -88);
}

#[tokio::test]
async fn test_three_invalid_replies_fall_back() {
    let mut gateway = MockGateway::new();
    gateway
        .expect_invoke()
        .times(MAX_ATTEMPTS as usize)
        .returning(|_, _| Ok(reply(vec![json!({"action": "explode", "reason": "x"})], "Boom.")));
    let director = WorldDirector::new(Arc::new(gateway));

    let outcome = director
        .run(request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, ValidationStatus::Fallback);
    assert_eq!(outcome.retry_count, 3);
    assert_eq!(outcome.narrator, FALLBACK_NARRATION);
    assert!(outcome.actions.is_empty());
    assert!(outcome.npc_directives.is_empty());
}

#[tokio::test]
async fn test_retry_shows_model_its_previous_reply() {
    let rejected = reply(vec![json!({"action": "spawn_npc", "reason": "x"})], "Hm.");
    let expected = rejected.clone();
    let mut calls = 0;
    let mut gateway = MockGateway::new();
    gateway
        .expect_invoke()
        .times(2)
        .returning(move |system, messages| {
            calls += 1;
            assert!(system.contains("spawn_vehicle"));
            if calls == 1 {
                assert_eq!(messages.len(), 1);
                return Ok(rejected.clone());
            }
            assert_eq!(messages.len(), 3);
            assert_eq!(messages[1].role, LlmRole::Assistant);
            assert_eq!(messages[1].content, expected);
            assert_eq!(messages[2].role, LlmRole::User);
            assert!(messages[2].content.contains("actions[0].npc_type"));
            assert!(messages[2].content.contains("actions[0].location"));
            Ok(reply(vec![tension(9)], "The city growls."))
        });
    let director = WorldDirector::new(Arc::new(gateway));

    let outcome = director
        .run(request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, ValidationStatus::Valid);
    assert_eq!(outcome.narrator, "The city growls.");
}

#[tokio::test]
async fn test_prose_wrapped_reply_is_recovered() {
    let wrapped = format!(
        "Sure! Here is what happens next:\n{}\nLet me know if you need more.",
        reply(vec![tension(4)], "Rain hammers the rooftops.")
    );
    let director = WorldDirector::new(Arc::new(scripted(vec![wrapped])));
    let outcome = director
        .run(request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, ValidationStatus::Valid);
    assert_eq!(outcome.attempts, 1);
}

/// Gateway that never answers in time
struct StalledGateway;

#[async_trait]
impl ModelGateway for StalledGateway {
    async fn invoke(&self, _: &str, _: &[LlmMessage]) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

#[tokio::test]
async fn test_cancel_interrupts_model_call() {
    let director = WorldDirector::new(Arc::new(StalledGateway));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), director.run(request(), &cancel))
        .await
        .expect("cancellation should end the run");
    assert!(matches!(
        result,
        Err(DirectorError::Cancelled(DirectorStage::GenerateActions))
    ));
}

fn arbitrary_reply() -> impl Strategy<Value = String> {
    let action = prop_oneof![
        (0u8..=12).prop_map(tension),
        Just(json!({"action": "send_to_npc", "npc_id": "npc_001", "event": "a scream", "reason": "r"})),
        Just(json!({"action": "change_weather", "condition": "fog", "transition": "instant", "reason": "r"})),
        Just(json!({"action": "change_weather", "condition": "acid_rain", "transition": "instant", "reason": "r"})),
        Just(json!({"action": "teleport", "reason": "r"})),
        Just(json!({"reason": "tagless"})),
    ];
    prop_oneof![
        (prop::collection::vec(action, 0..8), prop_oneof![Just(""), Just("Night falls.")])
            .prop_map(|(actions, narrator)| reply(actions, narrator)),
        Just("I cannot do that.".to_string()),
        Just("```json\n{\"actions\": [], \"narrator\": \"Quiet.\"}\n```".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_director_results_are_closed(replies in prop::collection::vec(arbitrary_reply(), 3)) {
        let director = WorldDirector::new(Arc::new(scripted(replies)));
        let outcome = tokio_test::block_on(director.run(request(), &CancellationToken::new()))
            .unwrap();

        prop_assert_ne!(outcome.status, ValidationStatus::Invalid);
        prop_assert!(outcome.attempts <= MAX_ATTEMPTS);
        prop_assert!(outcome.actions.len() + outcome.npc_directives.len() <= MAX_ACTIONS);
        for action in &outcome.actions {
            prop_assert!(ACTION_TAGS.contains(&action.tag()));
            prop_assert_ne!(action.tag(), "send_to_npc");
        }
        prop_assert!(!outcome.narrator.trim().is_empty());
    }
}
