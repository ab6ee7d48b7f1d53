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

//! Optional post-processing of agent dialogue before it reaches the game

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Cleans a dialogue line for downstream use (display, speech)
pub trait DialogueFilter: Send + Sync {
    fn clean(&self, dialogue: &str) -> String;
}

/// Text-to-speech collaborator
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Returns an audio reference (URL or data URI), or `None` when synthesis
    /// is unavailable or fails
    async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Option<String>;
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static ASTERISK_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*[^*]*\*").expect("valid regex"));
static PAREN_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("valid regex"));
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)""#).expect("valid regex"));
static GESTURES: Lazy<Regex> = Lazy::new(|| {
    let words = [
        r"smiling",
        r"laughing",
        r"coughing",
        r"winking",
        r"nodding",
        r"shaking\s+(?:head|my\s+head)",
        r"eyes?\s+(?:lightin?\s+up|widening|closing|contact)",
        r"adjusting\s+\w+(?:\s+\w+)?",
        r"pausing(?:\s+for\s+effect)?",
        r"clears?\s+(?:throat|voice)",
        r"gesturing",
        r"pointing",
        r"taps?\s+(?:fingers|foot|chest)",
        r"raises?\s+(?:hand|eyebrow)",
        r"frowning",
        r"smirking",
        r"grinning",
        r"crossing\s+arms",
        r"hugging",
        r"stamping\s+foot",
        r"pacing",
        r"chuckles?",
        r"tone",
        r"nerve",
        r"curious",
    ];
    Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).expect("valid regex")
});

/// Strips stage directions and gesture words that models like to sprinkle
/// into dialogue: `*smiles*`, `(pausing)`, surrounding quotes, "nodding".
#[derive(Debug, Clone, Copy, Default)]
pub struct StageDirectionFilter;

impl DialogueFilter for StageDirectionFilter {
    fn clean(&self, dialogue: &str) -> String {
        let text = WHITESPACE.replace_all(dialogue, " ");
        let text = ASTERISK_SPAN.replace_all(&text, "");
        let text = PAREN_SPAN.replace_all(&text, "");
        let text = QUOTED.replace_all(&text, "$1");
        let text = GESTURES.replace_all(&text, "");
        WHITESPACE.replace_all(&text, " ").trim().to_string()
    }
}
