use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use huddle_core::config::{LlmConfig, LlmProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        max_tokens: u32,
    ) -> Result<String>;

    /// False when the provider cannot be called at all (missing credential).
    /// The generator degrades to fallback copy without attempting a request.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Client for any chat-completions endpoint speaking the OpenAI wire shape,
/// which covers all three supported providers.
pub struct OpenAiCompatibleClient {
    api_key: Option<SecretString>,
    requires_key: bool,
    base_url: String,
    model: String,
    temperature: f64,
    http_client: reqwest::Client,
}

const DEFAULT_TEMPERATURE: f64 = 0.6;

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        Self {
            api_key: config.api_key.clone(),
            requires_key: config.provider != LlmProvider::Ollama,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: DEFAULT_TEMPERATURE,
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama => "http://localhost:11434/v1",
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        max_tokens: u32,
    ) -> Result<String> {
        let mut messages =
            vec![ChatMessage { role: "system".to_string(), content: system_prompt.to_string() }];
        messages.extend(history.iter().map(|turn| ChatMessage {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }));

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: Some(max_tokens),
            temperature: Some(self.temperature),
        };

        let mut builder = self.http_client.post(self.endpoint());
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .context("failed to send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat completion request failed ({status}): {body}");
        }

        let completion: ChatCompletionResponse =
            response.json().await.context("failed to parse chat completion response")?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            bail!("chat completion response contained no content");
        }

        Ok(content)
    }

    fn is_configured(&self) -> bool {
        !self.requires_key || self.api_key.is_some()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use huddle_core::config::{LlmConfig, LlmProvider};

    use super::{LanguageModel, OpenAiCompatibleClient};

    fn config(provider: LlmProvider, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: api_key.map(|key| key.to_string().into()),
            base_url: None,
            model: "test-model".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn hosted_provider_without_key_is_unconfigured() {
        let client = OpenAiCompatibleClient::from_config(&config(LlmProvider::OpenAi, None));
        assert!(!client.is_configured());

        let client =
            OpenAiCompatibleClient::from_config(&config(LlmProvider::OpenAi, Some("sk-test")));
        assert!(client.is_configured());
    }

    #[test]
    fn local_provider_needs_no_key() {
        let client = OpenAiCompatibleClient::from_config(&config(LlmProvider::Ollama, None));
        assert!(client.is_configured());
    }
}
