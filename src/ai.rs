use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.minimax.chat/v1/text/chatcompletion_pro";
pub const DEFAULT_MODEL: &str = "MiniMax-Text-01";

// --- Provider trait ---

/// A chat-completion backend. `Ok(None)` means the service answered but the
/// first choice carried no text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<Option<String>>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

// --- Chat-completion provider ---

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn first_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
    }
}

#[derive(Debug)]
pub struct ChatCompletionProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl ChatCompletionProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "TIPS_API_KEY is empty. Set it with: export TIPS_API_KEY=your-key-here"
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl ChatProvider for ChatCompletionProvider {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<Option<String>> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to chat-completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Chat-completion request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat-completion response")?;

        Ok(api_response.first_content())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
