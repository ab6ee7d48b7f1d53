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

/// Ollama provider
pub struct OllamaProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.provider != ProviderKind::Ollama {
            return Err(LlmError::ConfigError(format!(
                "{} is not an Ollama configuration",
                config.provider
            )));
        }

        let client = http_client(&config)?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
        #[derive(Serialize)]
        struct OllamaRequest {
            model: String,
            messages: Vec<LlmMessage>,
            stream: bool,
            #[serde(skip_serializing_if = "Option::is_none")]
            format: Option<&'static str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            options: Option<OllamaOptions>,
        }

        #[derive(Serialize)]
        struct OllamaOptions {
            #[serde(skip_serializing_if = "Option::is_none")]
            temperature: Option<f32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            num_predict: Option<u32>,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            message: LlmMessage,
            model: String,
            #[serde(default)]
            done: bool,
            #[serde(default)]
            eval_count: Option<u32>,
        }

        let options = if request.temperature.is_some() || request.max_tokens.is_some() {
            Some(OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            })
        } else {
            None
        };

        let ollama_request = OllamaRequest {
            model: request.model.clone(),
            messages: request.messages,
            stream: false,
            format: request.json_mode.then_some("json"),
            options,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .json(&ollama_request)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(LlmResponse {
            content: ollama_response.message.content,
            model: ollama_response.model,
            total_tokens: ollama_response.eval_count,
            finish_reason: if ollama_response.done {
                Some("stop".to_string())
            } else {
                None
            },
        })
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
