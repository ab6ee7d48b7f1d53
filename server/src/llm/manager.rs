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

//! LLM Manager for coordinating multiple providers

use super::gateway::{GatewayOptions, LlmGateway};
use super::providers::{LlmProvider, OllamaProvider, OpenAiCompatibleProvider};
use super::types::{LlmConfig, LlmError, ProviderKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// LLM Manager handles multiple named providers and hands out gateways
pub struct LlmManager {
    providers: Arc<RwLock<HashMap<String, Arc<dyn LlmProvider>>>>,
}

impl LlmManager {
    /// Create a new LLM manager
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Construct the provider for a configuration. Credential checks happen here.
    pub fn build_provider(config: LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let provider: Arc<dyn LlmProvider> = match config.provider {
            ProviderKind::Groq | ProviderKind::Mistral | ProviderKind::OpenAi => {
                Arc::new(OpenAiCompatibleProvider::new(config)?)
            }
            ProviderKind::Ollama => Arc::new(OllamaProvider::new(config)?),
        };
        Ok(provider)
    }

    /// Register a provider under `name`, replacing any earlier one
    pub async fn register_provider(
        &self,
        name: impl Into<String>,
        config: LlmConfig,
    ) -> Result<(), LlmError> {
        let name = name.into();
        let provider = Self::build_provider(config)?;
        tracing::debug!("Registered LLM provider '{}' ({})", name, provider.name());

        let mut providers = self.providers.write().await;
        providers.insert(name, provider);
        Ok(())
    }

    /// Get a provider by name
    pub async fn provider(&self, name: &str) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let providers = self.providers.read().await;
        providers.get(name).cloned().ok_or_else(|| {
            LlmError::ProviderUnavailable(format!("Provider '{}' not found", name))
        })
    }

    /// Build a gateway over a registered provider
    pub async fn gateway(
        &self,
        name: &str,
        options: GatewayOptions,
    ) -> Result<LlmGateway, LlmError> {
        Ok(LlmGateway::new(self.provider(name).await?, options))
    }
}

impl Default for LlmManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelGateway;

    #[tokio::test]
    async fn test_register_provider() {
        let manager = LlmManager::new();
        let config = LlmConfig::ollama("http://localhost:11434/api/chat", "llama2");

        let result = manager.register_provider("agent", config).await;
        assert!(result.is_ok());
        assert_eq!(manager.provider("agent").await.unwrap().name(), "Ollama");
    }

    #[tokio::test]
    async fn test_register_provider_replaces_earlier_one() {
        let manager = LlmManager::new();
        manager
            .register_provider("director", LlmConfig::ollama("http://localhost:11434/api/chat", "llama2"))
            .await
            .unwrap();
        manager
            .register_provider("director", LlmConfig::groq("gsk-test", "llama-3.3-70b-versatile"))
            .await
            .unwrap();
        assert_eq!(manager.provider("director").await.unwrap().name(), "Groq");
    }

    #[tokio::test]
    async fn test_register_provider_without_credential_fails() {
        let manager = LlmManager::new();
        let config = LlmConfig::for_provider(ProviderKind::Groq, None, "llama-3.3-70b-versatile");

        let result = manager.register_provider("director", config).await;
        assert!(matches!(result, Err(LlmError::ConfigError(_))));
        assert!(matches!(
            manager.provider("director").await,
            Err(LlmError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_gateway_for_unknown_provider() {
        let manager = LlmManager::new();
        let result = manager.gateway("nope", GatewayOptions::new("m")).await;
        assert!(matches!(result, Err(LlmError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_gateway_for_registered_provider() {
        let manager = LlmManager::new();
        manager
            .register_provider("agent", LlmConfig::ollama("http://127.0.0.1:9/api/chat", "llama2"))
            .await
            .unwrap();
        let gateway = manager
            .gateway("agent", GatewayOptions::new("llama2"))
            .await
            .unwrap();
        assert_eq!(gateway.options().model, "llama2");
        let _: &dyn ModelGateway = &gateway;
    }
}
