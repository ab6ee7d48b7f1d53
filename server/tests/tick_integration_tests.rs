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

//! End-to-end tests of a world tick: director run, directive dispatch and
//! the serialized tick report

use async_trait::async_trait;
use freecity_server::agent::CharacterAgent;
use freecity_server::director::WorldDirector;
use freecity_server::dispatch::DispatchCoordinator;
use freecity_server::llm::{LlmError, LlmMessage, ModelGateway};
use freecity_server::postprocess::StageDirectionFilter;
use freecity_server::tick::{NarrativeEngine, TickRequest};
use freecity_server::triggers::TriggerEngine;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Director model with a fixed reply
struct FixedGateway(String);

#[async_trait]
impl ModelGateway for FixedGateway {
    async fn invoke(&self, _: &str, _: &[LlmMessage]) -> Result<String, LlmError> {
        Ok(self.0.clone())
    }
}

fn engine(director_reply: serde_json::Value, agent_reply: &str) -> NarrativeEngine {
    let director = WorldDirector::new(Arc::new(FixedGateway(director_reply.to_string())));
    let agent = CharacterAgent::new(
        Arc::new(FixedGateway(agent_reply.to_string())),
        Arc::new(TriggerEngine::default()),
    );
    let dispatcher =
        DispatchCoordinator::new(Arc::new(agent), 4).with_filter(Arc::new(StageDirectionFilter));
    NarrativeEngine::new(director, dispatcher)
}

fn scenario() -> TickRequest {
    serde_json::from_value(json!({
        "world_state": {
            "player_karma": 55,
            "weather": "cloudy",
            "location": "marketplace"
        },
        "recent_events": [{"source": "player", "action": "helped a lost child"}],
        "active_npcs": {
            "npc_001": {"npc_identity": "A fruit vendor", "type": "street_vendor", "location": "market_stall"},
            "npc_002": {"npc_identity": "A guard", "type": "guard"},
            "npc_003": {"npc_identity": "Another guard", "type": "guard"}
        }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_tick_report() {
    let engine = engine(
        json!({
            "actions": [
                {"action": "send_to_npc", "npc_id": "npc_001", "event": "The player helped a lost child right in front of you", "reason": "witness"},
                {"action": "send_to_npc", "npc_id": "all", "npc_type": "guard", "event": "A citizen reported a good deed", "reason": "word spreads"},
                {"action": "send_to_npc", "npc_id": "npc_777", "event": "Nobody is here", "reason": "stale id"},
                {"action": "change_weather", "condition": "clear", "transition": "gradual", "reason": "good karma"}
            ],
            "narrator": "Word spreads fast in these streets, and even the clouds part in quiet approval."
        }),
        "(nodding) \"What a kind soul.\"",
    );

    let outcome = engine.tick(scenario(), &CancellationToken::new()).await.unwrap();
    let report = serde_json::to_value(&outcome).unwrap();

    assert_eq!(report["validation_status"], "VALID");
    assert_eq!(report["retry_count"], 0);
    assert_eq!(report["actions"].as_array().unwrap().len(), 1);
    assert_eq!(report["actions"][0]["action"], "change_weather");
    assert_eq!(report["npc_directives"].as_array().unwrap().len(), 3);

    let responses = report["npc_responses"].as_array().unwrap();
    let ids: Vec<&str> = responses
        .iter()
        .map(|response| response["npc_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["npc_001", "npc_002", "npc_003", "npc_777"]);

    assert_eq!(responses[0]["status"], "VALID");
    assert_eq!(responses[0]["response"]["dialogue"], "What a kind soul.");
    assert_eq!(responses[0]["response"]["emotion"], "GRATEFUL");
    assert_eq!(responses[0]["response"]["trust_score"], 7);
    assert_eq!(responses[3]["failure"], "target_not_found");

    let vendor = outcome.npc_responses[0].state.as_ref().unwrap();
    assert_eq!(vendor.world_state.location, "market_stall");
    assert_eq!(vendor.recent_events[0].source, "world_director");
    let guard = outcome.npc_responses[1].state.as_ref().unwrap();
    assert_eq!(guard.world_state.location, "marketplace");
    assert_eq!(guard.world_state.weather, "cloudy");
}

#[tokio::test]
async fn test_unusable_director_falls_back_without_dispatch() {
    let engine = engine(json!("not an object"), "Hello.");
    let outcome = engine.tick(scenario(), &CancellationToken::new()).await.unwrap();
    let report = serde_json::to_value(&outcome).unwrap();

    assert_eq!(report["validation_status"], "FALLBACK");
    assert_eq!(report["retry_count"], 3);
    assert_eq!(report["narrator"], "The world holds its breath, waiting.");
    assert!(report["npc_responses"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_tick() {
    let engine = engine(json!({"actions": [], "narrator": "Quiet."}), "Hello.");
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(engine.tick(scenario(), &cancel).await.is_err());
}
