use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::config::DEFAULT_LLM_BASE_URL;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<String>;

    /// Completion at a caller-chosen temperature. Providers without a
    /// temperature knob ignore it.
    async fn complete_with_temperature(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
    ) -> Result<String> {
        self.complete(messages).await
    }

    fn model(&self) -> &str {
        "unknown"
    }
}

/// Chat completions against any OpenAI-compatible gateway.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleProvider {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAICompatibleProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model,
            max_tokens: 4096,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, messages: Vec<Message>, temperature: Option<f32>) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: m.role,
                    content: Some(m.content),
                })
                .collect(),
            max_tokens: Some(self.max_tokens),
            temperature,
        };

        log::debug!("POST {} model={}", self.endpoint(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("LLM API error {}: {}", status, body);
        }

        let result: ChatResponse = response.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        self.send(messages, None).await
    }

    async fn complete_with_temperature(
        &self,
        messages: Vec<Message>,
        temperature: f32,
    ) -> Result<String> {
        self.send(messages, Some(temperature)).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Mock provider for testing
pub struct MockLLMProvider {
    response: String,
}

impl MockLLMProvider {
    pub fn new() -> Self {
        Self {
            response: "# Mock Post\n\nMock content.".to_string(),
        }
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn complete(&self, _messages: Vec<Message>) -> Result<String> {
        Ok(self.response.clone())
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// Replays queued responses in order and records every prompt it receives.
/// Once the queue is empty it keeps returning the fallback response.
pub struct ScriptedLLMProvider {
    responses: Mutex<VecDeque<String>>,
    fallback: String,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedLLMProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            fallback: "Final Answer: done".to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedLLMProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(messages);
        }
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
