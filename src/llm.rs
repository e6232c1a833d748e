//! Chat-completion clients that turn a [`Prompt`] into raw SQL text.
//!
//! One request per invocation, no retries. The sampling temperature is
//! pinned to zero so the same question against the same schema tends to
//! produce the same query.
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication |
//! |----------|----------|----------------|
//! | OpenAI | `{base_url}/chat/completions` | Bearer token |
//! | Anthropic | `api.anthropic.com/v1/messages` | x-api-key header |
//! | Ollama | `{base_url}/api/chat` | None |
//!
//! Any OpenAI-compatible server works with the OpenAI provider by pointing
//! `base_url` at it.
//!
//! # Example
//!
//! ```
//! use sql_ask::llm::{LlmClient, LlmProvider};
//!
//! let provider = LlmProvider::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model:    "llama3.2".into()
//! };
//!
//! let client = LlmClient::new(provider);
//! assert_eq!(client.model(), "llama3.2");
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{AppResult, http_error, llm_api_error},
    prompt::Prompt
};

/// Default OpenAI API root
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default local Ollama server
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Anything that can answer a prompt with text.
///
/// Implemented by [`LlmClient`]; tests substitute canned responses.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send exactly one completion request
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success status codes and responses
    /// without any message text.
    async fn complete(&self, prompt: &Prompt) -> AppResult<String>;
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug)]
pub enum LlmProvider {
    /// OpenAI or any OpenAI-compatible chat completions API
    OpenAI {
        /// API key (sk-...)
        api_key:  SecretString,
        /// Model identifier (e.g., "gpt-4o")
        model:    String,
        /// API root, without the `/chat/completions` suffix
        base_url: String
    },
    /// Anthropic API (Claude models)
    Anthropic {
        /// API key
        api_key: SecretString,
        /// Model identifier (e.g., "claude-sonnet-4-20250514")
        model:   String
    },
    /// Local Ollama instance
    Ollama {
        /// Base URL (e.g., "http://localhost:11434")
        base_url: String,
        /// Model name (e.g., "llama3.2", "sqlcoder")
        model:    String
    }
}

impl LlmProvider {
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI {
                model, ..
            }
            | Self::Anthropic {
                model, ..
            }
            | Self::Ollama {
                model, ..
            } => model
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::OpenAI {
                ..
            } => "OpenAI",
            Self::Anthropic {
                ..
            } => "Anthropic",
            Self::Ollama {
                ..
            } => "Ollama"
        }
    }
}

/// HTTP client for LLM API communication.
pub struct LlmClient {
    provider: LlmProvider,
    client:   reqwest::Client
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role:    &'a str,
    content: &'a str
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model:       &'a str,
    messages:    Vec<ChatMessage<'a>>,
    temperature: f32
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model:       &'a str,
    max_tokens:  u32,
    system:      &'a str,
    messages:    Vec<ChatMessage<'a>>,
    temperature: f32
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicContent>
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: Option<String>
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model:    &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream:   bool,
    options:  OllamaOptions
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: Option<String>
}

impl LlmClient {
    pub fn new(provider: LlmProvider) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { provider, client }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    async fn call_openai(
        &self,
        api_key: &SecretString,
        model: &str,
        base_url: &str,
        prompt: &Prompt
    ) -> AppResult<Option<String>> {
        let request = OpenAIRequest {
            model,
            messages: chat_messages(prompt),
            temperature: 0.0
        };
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }
        let result: OpenAIResponse = response.json().await.map_err(http_error)?;
        Ok(result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content))
    }

    async fn call_anthropic(
        &self,
        api_key: &SecretString,
        model: &str,
        prompt: &Prompt
    ) -> AppResult<Option<String>> {
        let request = AnthropicRequest {
            model,
            max_tokens: 4096,
            system: &prompt.system,
            messages: vec![ChatMessage {
                role:    "user",
                content: &prompt.user
            }],
            temperature: 0.0
        };
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Anthropic API error {}: {}",
                status, text
            )));
        }
        let result: AnthropicResponse = response.json().await.map_err(http_error)?;
        Ok(result.content.into_iter().find_map(|c| c.text))
    }

    async fn call_ollama(
        &self,
        base_url: &str,
        model: &str,
        prompt: &Prompt
    ) -> AppResult<Option<String>> {
        let request = OllamaRequest {
            model,
            messages: chat_messages(prompt),
            stream: false,
            options: OllamaOptions { temperature: 0.0 }
        };
        let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }
        let result: OllamaResponse = response.json().await.map_err(http_error)?;
        Ok(result.message.and_then(|m| m.content))
    }
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn complete(&self, prompt: &Prompt) -> AppResult<String> {
        debug!(
            provider = self.provider.name(),
            model = self.model(),
            "sending completion request"
        );
        let text = match &self.provider {
            LlmProvider::OpenAI {
                api_key,
                model,
                base_url
            } => self.call_openai(api_key, model, base_url, prompt).await?,
            LlmProvider::Anthropic {
                api_key,
                model
            } => self.call_anthropic(api_key, model, prompt).await?,
            LlmProvider::Ollama {
                base_url,
                model
            } => self.call_ollama(base_url, model, prompt).await?
        };
        require_text(text, self.provider.name())
    }
}

fn chat_messages(prompt: &Prompt) -> Vec<ChatMessage<'_>> {
    vec![
        ChatMessage {
            role:    "system",
            content: &prompt.system
        },
        ChatMessage {
            role:    "user",
            content: &prompt.user
        },
    ]
}

/// Treat a missing or blank message body as an upstream failure
pub fn require_text(text: Option<String>, provider: &str) -> AppResult<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(llm_api_error(format!("No response from {}", provider)))
    }
}
