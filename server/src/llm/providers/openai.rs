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

use super::{error_for_status, http_client, network_error};
use crate::llm::{LlmConfig, LlmError, LlmMessage, LlmProvider, LlmRequest, LlmResponse, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider for every backend speaking the OpenAI chat-completions format
/// (OpenAI, Groq, Mistral)
pub struct OpenAiCompatibleProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider. A credential is mandatory.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if !config.provider.is_openai_compatible() {
            return Err(LlmError::ConfigError(format!(
                "{} does not use the OpenAI wire format",
                config.provider
            )));
        }
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(LlmError::ConfigError(format!(
                "{} requires an API key",
                config.provider
            )));
        }

        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<LlmMessage>,
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            max_tokens: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<ResponseFormat>,
        }

        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
            usage: Option<ChatUsage>,
            model: String,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: LlmMessage,
            finish_reason: Option<String>,
        }

        #[derive(Deserialize)]
        struct ChatUsage {
            total_tokens: u32,
        }

        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::AuthError("No API key configured".to_string()))?;

        let chat_request = ChatRequest {
            model: request.model.clone(),
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ApiError(format!("Failed to parse response: {}", e)))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ApiError("No choices in response".to_string()))?;

        Ok(LlmResponse {
            content: choice.message.content,
            model: chat_response.model,
            total_tokens: chat_response.usage.map(|u| u.total_tokens),
            finish_reason: choice.finish_reason,
        })
    }

    fn name(&self) -> &str {
        match self.config.provider {
            ProviderKind::Groq => "Groq",
            ProviderKind::Mistral => "Mistral",
            _ => "OpenAI",
        }
    }
}
