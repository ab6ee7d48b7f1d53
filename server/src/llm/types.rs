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

//! Common types for LLM integration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// LLM message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for LlmRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmRole::System => write!(f, "system"),
            LlmRole::User => write!(f, "user"),
            LlmRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in an LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::Assistant,
            content: content.into(),
        }
    }
}

/// LLM request parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Conversation history
    pub messages: Vec<LlmMessage>,
    /// Model to use (provider-specific)
    pub model: String,
    /// Temperature (0.0 - 2.0, higher = more random)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Ask the provider to constrain output to a single JSON object
    #[serde(default)]
    pub json_mode: bool,
}

impl LlmRequest {
    /// Create a new LLM request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            json_mode: false,
        }
    }

    /// Add a message to the request
    pub fn with_message(mut self, message: LlmMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Add multiple messages
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = LlmMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request JSON object output
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }
}

/// LLM response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content
    pub content: String,
    /// Model used
    pub model: String,
    /// Total tokens
    pub total_tokens: Option<u32>,
    /// Finish reason
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// Create a new response
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            total_tokens: None,
            finish_reason: None,
        }
    }
}

/// LLM error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// Network or connection error
    #[error("Network error: {0}")]
    NetworkError(String),
    /// API error (invalid request, rate limit, etc.)
    #[error("API error: {0}")]
    ApiError(String),
    /// Authentication error
    #[error("Authentication error: {0}")]
    AuthError(String),
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Provider not available
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Timeout
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

/// Supported chat-completion backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    Mistral,
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Groq,
        ProviderKind::Mistral,
        ProviderKind::OpenAi,
        ProviderKind::Ollama,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Mistral => "mistral",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }

    /// Model used when neither configuration nor environment names one
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::Mistral => "mistral-large-latest",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Ollama => "llama2",
        }
    }

    /// Chat endpoint used when configuration names none
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "https://api.groq.com/openai/v1/chat/completions",
            ProviderKind::Mistral => "https://api.mistral.ai/v1/chat/completions",
            ProviderKind::OpenAi => "https://api.openai.com/v1/chat/completions",
            ProviderKind::Ollama => "http://localhost:11434/api/chat",
        }
    }

    /// Environment variable holding the provider credential
    pub fn credential_var(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Groq => Some("GROQ_API_KEY"),
            ProviderKind::Mistral => Some("MISTRAL_API_KEY"),
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Ollama => None,
        }
    }

    /// Whether requests go through the OpenAI-compatible wire format
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, ProviderKind::Ollama)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| {
                LlmError::ConfigError(format!(
                    "Unknown provider type: {} (supported: groq, mistral, openai, ollama)",
                    s
                ))
            })
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider backend
    pub provider: ProviderKind,
    /// API endpoint URL
    pub endpoint: String,
    /// API key (if required)
    pub api_key: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl LlmConfig {
    /// Create a configuration for any provider using its default endpoint
    pub fn for_provider(
        provider: ProviderKind,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            endpoint: provider.default_endpoint().to_string(),
            api_key,
            default_model: model.into(),
            timeout_seconds: 30,
        }
    }

    /// Create OpenAI configuration
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(ProviderKind::OpenAi, Some(api_key.into()), model)
    }

    /// Create Groq configuration
    pub fn groq(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::for_provider(ProviderKind::Groq, Some(api_key.into()), model)
    }

    /// Create Ollama configuration
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: ProviderKind::Ollama,
            endpoint: endpoint.into(),
            api_key: None,
            default_model: model.into(),
            timeout_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_message_creation() {
        let system_msg = LlmMessage::system("You are the world director");
        assert_eq!(system_msg.role, LlmRole::System);

        let user_msg = LlmMessage::user("What happens next?");
        assert_eq!(user_msg.role, LlmRole::User);

        let assistant_msg = LlmMessage::assistant("{}");
        assert_eq!(assistant_msg.role, LlmRole::Assistant);
    }

    #[test]
    fn test_llm_request_builder() {
        let request = LlmRequest::new("llama2")
            .with_message(LlmMessage::system("You are an NPC"))
            .with_message(LlmMessage::user("Hello"))
            .with_temperature(0.7)
            .with_max_tokens(100)
            .with_json_mode(true);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(100));
        assert!(request.json_mode);
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("GROQ".parse::<ProviderKind>(), Ok(ProviderKind::Groq));
        assert_eq!(" ollama ".parse::<ProviderKind>(), Ok(ProviderKind::Ollama));
        assert!(matches!(
            "anthropic".parse::<ProviderKind>(),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn test_llm_config() {
        let groq = LlmConfig::groq("gsk-test", "llama-3.3-70b-versatile");
        assert_eq!(groq.provider, ProviderKind::Groq);
        assert!(groq.api_key.is_some());
        assert!(groq.endpoint.contains("groq.com"));

        let ollama = LlmConfig::ollama("http://localhost:11434/api/chat", "llama2");
        assert_eq!(ollama.provider, ProviderKind::Ollama);
        assert!(ollama.api_key.is_none());
        assert_eq!(ProviderKind::Ollama.credential_var(), None);
    }
}
