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

//! LLM provider implementations

mod ollama;
mod openai;

pub use self::ollama::OllamaProvider;
pub use self::openai::OpenAiCompatibleProvider;

use super::types::{LlmConfig, LlmError, LlmRequest, LlmResponse};
use async_trait::async_trait;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a request to the LLM
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Build the HTTP client shared by every provider
pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an [`LlmError`]
pub(crate) async fn error_for_status(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    match status.as_u16() {
        401 | 403 => LlmError::AuthError(format!("API returned {}: {}", status, error_text)),
        _ => LlmError::ApiError(format!("API returned {}: {}", status, error_text)),
    }
}

/// Map a transport failure, keeping timeouts distinguishable
pub(crate) fn network_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout(format!("Request timed out: {}", error))
    } else {
        LlmError::NetworkError(format!("Request failed: {}", error))
    }
}
