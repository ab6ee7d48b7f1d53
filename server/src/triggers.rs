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

//! Keyword triggers
//!
//! Two ordered tables are scanned independently against the lowercased
//! input text. In each table the first rule whose keyword occurs anywhere in
//! the text wins; there is no scoring and no longest-match preference, so
//! reordering a table changes results. A single text may match unrelated
//! rules in the two tables (e.g. "gift" is both GRATEFUL and GIVE_ITEM).

use freecity_common::character::{Emotion, EmotionEffect, TriggerMatch};
use serde::{Deserialize, Serialize};

/// Keyword mapped to an emotion and trust change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionRule {
    pub keyword: String,
    pub emotion: Emotion,
    pub trust_delta: i32,
}

impl EmotionRule {
    pub fn new(keyword: impl Into<String>, emotion: Emotion, trust_delta: i32) -> Self {
        Self {
            keyword: keyword.into(),
            emotion,
            trust_delta,
        }
    }
}

/// Keyword mapped to an action-trigger label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    pub keyword: String,
    pub label: String,
}

impl ActionRule {
    pub fn new(keyword: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            label: label.into(),
        }
    }
}

/// Both trigger tables, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerTables {
    #[serde(default = "default_emotion_rules")]
    pub emotion: Vec<EmotionRule>,
    #[serde(default = "default_action_rules")]
    pub action: Vec<ActionRule>,
}

impl Default for TriggerTables {
    fn default() -> Self {
        Self {
            emotion: default_emotion_rules(),
            action: default_action_rules(),
        }
    }
}

pub fn default_emotion_rules() -> Vec<EmotionRule> {
    use Emotion::*;
    [
        ("gift", Grateful, 2),
        ("thank", Grateful, 1),
        ("help", Grateful, 2),
        ("threat", Angry, -2),
        ("attack", Angry, -3),
        ("insult", Angry, -1),
        ("scared", Suspicious, -1),
        ("lie", Suspicious, -2),
        ("suspicious", Suspicious, -1),
        ("joke", Happy, 1),
        ("laugh", Happy, 1),
        ("excited", Excited, 1),
        ("sad", Sad, 0),
        ("confused", Confused, 0),
    ]
    .into_iter()
    .map(|(keyword, emotion, delta)| EmotionRule::new(keyword, emotion, delta))
    .collect()
}

pub fn default_action_rules() -> Vec<ActionRule> {
    [
        ("attack", "ATTACK"),
        ("punch", "PUNCH"),
        ("kick", "KICK"),
        ("run", "WALK_AWAY"),
        ("flee", "WALK_AWAY"),
        ("give", "GIVE_ITEM"),
        ("gift", "GIVE_ITEM"),
        ("trade", "TRADE"),
        ("talk", "NONE"),
        ("walk", "NONE"),
        ("stand", "NONE"),
    ]
    .into_iter()
    .map(|(keyword, label)| ActionRule::new(keyword, label))
    .collect()
}

/// Deterministic keyword lookup
#[derive(Debug, Clone)]
pub struct TriggerEngine {
    emotion: Vec<EmotionRule>,
    action: Vec<ActionRule>,
}

impl Default for TriggerEngine {
    fn default() -> Self {
        Self::new(TriggerTables::default())
    }
}

impl TriggerEngine {
    /// Build an engine from tables. Keywords are lowercased so matching is
    /// case-insensitive on both sides; empty keywords are dropped since they
    /// would match every text.
    pub fn new(tables: TriggerTables) -> Self {
        let emotion = tables
            .emotion
            .into_iter()
            .filter(|rule| !rule.keyword.trim().is_empty())
            .map(|rule| EmotionRule {
                keyword: rule.keyword.to_lowercase(),
                ..rule
            })
            .collect();
        let action = tables
            .action
            .into_iter()
            .filter(|rule| !rule.keyword.trim().is_empty())
            .map(|rule| ActionRule {
                keyword: rule.keyword.to_lowercase(),
                ..rule
            })
            .collect();
        Self { emotion, action }
    }

    pub fn check_emotion(&self, text: &str) -> Option<EmotionEffect> {
        let text = text.to_lowercase();
        self.emotion
            .iter()
            .find(|rule| text.contains(&rule.keyword))
            .map(|rule| EmotionEffect {
                emotion: rule.emotion,
                trust_delta: rule.trust_delta,
            })
    }

    pub fn check_action(&self, text: &str) -> Option<String> {
        let text = text.to_lowercase();
        self.action
            .iter()
            .find(|rule| text.contains(&rule.keyword))
            .map(|rule| rule.label.clone())
    }

    /// Run both tables over the same text
    pub fn evaluate(&self, text: &str) -> TriggerMatch {
        let matched = TriggerMatch {
            emotion_trigger: self.check_emotion(text),
            action_trigger: self.check_action(text),
        };
        if matched.emotion_trigger.is_some() || matched.action_trigger.is_some() {
            tracing::trace!(?matched, "Trigger matched");
        }
        matched
    }
}
