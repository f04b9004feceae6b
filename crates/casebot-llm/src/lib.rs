// SPDX-FileCopyrightText: 2026 Casebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible language-model provider for Casebot.
//!
//! Implements [`ProviderAdapter`] over the Chat Completions API. Any server
//! speaking that protocol works by pointing `llm.base_url` at it.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use casebot_config::model::LlmConfig;
use casebot_core::types::{ChatRole, ProviderRequest, ProviderResponse};
use casebot_core::{AdapterType, CaseError, HealthStatus, PluginAdapter, ProviderAdapter};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ApiMessage, ChatCompletionRequest};

/// Language-model provider implementing [`ProviderAdapter`].
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: String,
}

impl OpenAiProvider {
    /// Creates the provider from configuration.
    ///
    /// `system_prompt` is used when a request does not carry its own.
    /// `timeout` bounds each HTTP attempt.
    pub fn new(
        config: &LlmConfig,
        system_prompt: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CaseError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CaseError::InvalidConfiguration("llm.api_key is required".into()))?;
        let client = OpenAiClient::new(api_key, &config.base_url, timeout)?;
        info!(model = %config.model, endpoint = client.endpoint(), "language model provider initialized");
        Ok(Self {
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            system_prompt: system_prompt.into(),
        })
    }

    fn to_completion_request(&self, request: &ProviderRequest) -> ChatCompletionRequest {
        let system = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| self.system_prompt.clone());
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !system.is_empty() {
            messages.push(ApiMessage {
                role: ChatRole::System.to_string(),
                content: system,
            });
        }
        messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        }));
        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CaseError> {
        // No API call: health checks must not consume tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CaseError> {
        debug!("language model provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CaseError> {
        let api_request = self.to_completion_request(&request);
        let response = self.client.complete(&api_request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CaseError::Provider {
                message: "model returned no answer".into(),
                source: None,
            })?;
        let model = if response.model.is_empty() {
            self.model.clone()
        } else {
            response.model
        };
        Ok(ProviderResponse { content, model })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebot_core::types::ProviderMessage;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-test".into()),
            base_url: base_url.into(),
            ..LlmConfig::default()
        }
    }

    fn provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(&config(base_url), "You assess claims.", Duration::from_secs(5))
            .unwrap()
    }

    fn user_request(text: &str) -> ProviderRequest {
        ProviderRequest {
            system_prompt: None,
            messages: vec![ProviderMessage {
                role: ChatRole::User,
                content: text.into(),
            }],
        }
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let config = LlmConfig::default();
        let err = OpenAiProvider::new(&config, "", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, CaseError::InvalidConfiguration(_)));
    }

    #[test]
    fn request_prepends_system_prompt() {
        let p = provider("http://localhost:1");
        let req = p.to_completion_request(&user_request("hello"));
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[0].content, "You assess claims.");
        assert_eq!(req.messages[1].role, "user");
        assert_eq!(req.model, "gpt-4o-mini");
    }

    #[test]
    fn request_system_prompt_overrides_default() {
        let p = provider("http://localhost:1");
        let mut request = user_request("hello");
        request.system_prompt = Some("Custom".into());
        let req = p.to_completion_request(&request);
        assert_eq!(req.messages[0].content, "Custom");
    }

    #[tokio::test]
    async fn complete_returns_trimmed_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system", "content": "You assess claims."}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "c1",
                "model": "gpt-4o-mini-2024-07-18",
                "choices": [{"message": {"role": "assistant", "content": "  Minor damage.\n"}}]
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .complete(user_request("assess"))
            .await
            .unwrap();
        assert_eq!(response.content, "Minor damage.");
        assert_eq!(response.model, "gpt-4o-mini-2024-07-18");
    }

    #[tokio::test]
    async fn empty_answer_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .complete(user_request("assess"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaseError::Provider { .. }));
    }
}
