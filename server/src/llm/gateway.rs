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

//! Model Gateway: the single "send messages, get text" contract used by the
//! pipelines

use super::providers::LlmProvider;
use super::types::{LlmError, LlmMessage, LlmRequest};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Single-shot model invocation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send a system prompt and message history, returning the raw reply text
    async fn invoke(
        &self,
        system_prompt: &str,
        messages: &[LlmMessage],
    ) -> Result<String, LlmError>;
}

/// Sampling and deadline settings for a gateway
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
    /// Deadline for one invocation, including the provider round-trip
    pub timeout: Duration,
}

impl GatewayOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            json_mode: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`ModelGateway`] backed by a registered [`LlmProvider`]
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    options: GatewayOptions,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, options: GatewayOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    fn build_request(&self, system_prompt: &str, messages: &[LlmMessage]) -> LlmRequest {
        let mut request = LlmRequest::new(self.options.model.clone())
            .with_message(LlmMessage::system(system_prompt))
            .with_messages(messages.iter().cloned())
            .with_temperature(self.options.temperature)
            .with_json_mode(self.options.json_mode);
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        request
    }
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.name())
            .field("options", &self.options)
            .finish()
    }
}

#[async_trait]
impl ModelGateway for LlmGateway {
    async fn invoke(
        &self,
        system_prompt: &str,
        messages: &[LlmMessage],
    ) -> Result<String, LlmError> {
        let request = self.build_request(system_prompt, messages);
        tracing::debug!(
            provider = self.provider.name(),
            model = %self.options.model,
            messages = request.messages.len(),
            "Invoking model"
        );

        let response = tokio::time::timeout(self.options.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                LlmError::Timeout(format!(
                    "{} did not answer within {:?}",
                    self.provider.name(),
                    self.options.timeout
                ))
            })??;

        tracing::trace!(
            model = %response.model,
            tokens = ?response.total_tokens,
            "Model answered"
        );
        Ok(response.content)
    }
}
