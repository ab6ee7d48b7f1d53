//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
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

use crate::llm::{GatewayOptions, LlmConfig, ProviderKind};
use crate::triggers::TriggerTables;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::time::Duration;
use thiserror::Error;

/// Ollama host used when neither configuration nor environment names one
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "server/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "server/.env"
    )]
    pub env_file: Option<String>,

    #[arg(
        short = 's',
        long = "scenario",
        help = "Path to a JSON tick request (world_state, recent_events, active_npcs)",
        default_value = "server/scenario.json"
    )]
    pub scenario: String,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
            scenario: "scenario.json".to_string(),
        }
    }
}

/// Configuration failures. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown LLM provider '{0}' (supported: groq, mistral, openai, ollama)")]
    UnknownProvider(String),
    #[error("Provider '{provider}' requires a credential; set {variable} or configure api_key")]
    MissingCredential {
        provider: ProviderKind,
        variable: &'static str,
    },
    #[error("Failed to open config file: {0}")]
    Load(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub director: GatewaySettings,
    #[serde(default)]
    pub agent: GatewaySettings,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub triggers: TriggerTables,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, ConfigError> {
        let conf: Configuration = serde_yaml::from_reader(std::fs::File::open(path)?)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Reject values that cannot produce a working engine
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_concurrency must be at least 1".to_string(),
            ));
        }
        for (name, settings) in [("director", &self.director), ("agent", &self.agent)] {
            if settings.timeout_seconds == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{}.timeout_seconds must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Which pipeline a set of gateway settings belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineRole {
    Director,
    Agent,
}

impl PipelineRole {
    fn provider_var(&self) -> &'static str {
        match self {
            PipelineRole::Director => "WORLD_LLM_PROVIDER",
            PipelineRole::Agent => "LLM_PROVIDER",
        }
    }

    fn model_var(&self) -> &'static str {
        match self {
            PipelineRole::Director => "WORLD_LLM_MODEL",
            PipelineRole::Agent => "LLM_MODEL",
        }
    }

    fn default_provider(&self) -> ProviderKind {
        match self {
            PipelineRole::Director => ProviderKind::Groq,
            PipelineRole::Agent => ProviderKind::Ollama,
        }
    }

    fn default_temperature(&self) -> f32 {
        match self {
            PipelineRole::Director => 0.8,
            PipelineRole::Agent => 0.7,
        }
    }
}

/// Model gateway settings for one pipeline. Every field is optional; unset
/// fields fall back to the environment and then to built-in defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// May reference the environment, e.g. `${GROQ_API_KEY}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<EnvField<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GatewaySettings {
    /// Resolve against the process environment
    pub fn resolve(&self, role: PipelineRole) -> Result<ResolvedGateway, ConfigError> {
        self.resolve_with(role, |name| std::env::var(name).ok())
    }

    /// Resolve provider, model, endpoint and credential.
    ///
    /// Each value is taken from these settings first, then from `env`, then
    /// from the provider defaults. A missing credential for a provider that
    /// needs one is an error.
    pub fn resolve_with<F>(&self, role: PipelineRole, env: F) -> Result<ResolvedGateway, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let provider = match self.provider.clone().or_else(|| env(role.provider_var())) {
            Some(name) => name
                .parse::<ProviderKind>()
                .map_err(|_| ConfigError::UnknownProvider(name))?,
            None => role.default_provider(),
        };

        let model = self
            .model
            .clone()
            .or_else(|| env(role.model_var()))
            .unwrap_or_else(|| provider.default_model().to_string());

        let api_key = match provider.credential_var() {
            Some(variable) => {
                let configured = self
                    .api_key
                    .as_ref()
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty());
                match configured.or_else(|| env(variable)) {
                    Some(key) => Some(key),
                    None => return Err(ConfigError::MissingCredential { provider, variable }),
                }
            }
            None => None,
        };

        let endpoint = match (&self.endpoint, provider) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, ProviderKind::Ollama) => {
                let base = env("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
                format!("{}/api/chat", base.trim_end_matches('/'))
            }
            (None, other) => other.default_endpoint().to_string(),
        };

        let timeout_seconds = self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        let llm = LlmConfig {
            provider,
            endpoint,
            api_key,
            default_model: model.clone(),
            timeout_seconds,
        };

        let mut options = GatewayOptions::new(model)
            .with_temperature(self.temperature.unwrap_or(role.default_temperature()))
            .with_json_mode(role == PipelineRole::Director)
            .with_timeout(Duration::from_secs(timeout_seconds));
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        tracing::debug!(
            role = ?role,
            provider = %llm.provider,
            model = %llm.default_model,
            endpoint = %llm.endpoint,
            "Resolved model gateway"
        );

        Ok(ResolvedGateway { llm, options })
    }
}

/// Provider configuration plus per-call options for one pipeline
#[derive(Debug, Clone)]
pub struct ResolvedGateway {
    pub llm: LlmConfig,
    pub options: GatewayOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on concurrently running character agents per tick
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}
