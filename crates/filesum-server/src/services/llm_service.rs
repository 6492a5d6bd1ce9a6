use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::utils::error::GatewayError;

const SUMMARY_SYSTEM_PROMPT: &str = "你是一个文件总结助手。";
const ANSWER_SYSTEM_PROMPT: &str = "你是一个文件问答助手。请基于给定的文件内容回答问题。";

/// Summarize/answer oracle. The controller only talks to this seam so tests can
/// swap the HTTP client for a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// `text` is embedded as-is; callers truncate beforehand.
    async fn summarize(&self, text: &str, prompt: &str) -> Result<String, GatewayError>;

    async fn answer(&self, text: &str, question: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
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
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

/// Hard-truncate `text` to `max_chars` characters plus a trailing "...".
/// Counts chars, not bytes, so CJK text is never split inside a code point.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

pub fn summary_messages(text: &str, prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
        ChatMessage::user(format!("{}\n\n{}", prompt, text)),
    ]
}

pub fn answer_messages(text: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ANSWER_SYSTEM_PROMPT),
        ChatMessage::user(format!("文件内容如下：\n\n{}\n\n问题：{}", text, question)),
    ]
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// One request/response exchange, no retry
    pub async fn generate_chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<usize>,
    ) -> Result<String, GatewayError> {
        debug!("Starting chat generation with {} messages", messages.len());

        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("LLM request failed after {:?}: {}", started.elapsed(), e);
                GatewayError::Transport(e.to_string())
            })?;

        let status = response.status();
        info!("LLM API responded {} in {:?}", status, started.elapsed());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API error: {} - {}", status, body);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::InvalidResponse("No choices returned from LLM".to_string()))
    }
}

#[async_trait]
impl LlmProvider for LlmService {
    async fn summarize(&self, text: &str, prompt: &str) -> Result<String, GatewayError> {
        self.generate_chat(summary_messages(text, prompt), None, None)
            .await
    }

    async fn answer(&self, text: &str, question: &str) -> Result<String, GatewayError> {
        self.generate_chat(
            answer_messages(text, question),
            Some(self.config.answer_temperature),
            Some(self.config.answer_max_tokens),
        )
        .await
    }
}
