use async_trait::async_trait;
use std::error::Error as StdError;

use super::openai::OpenAIChatClient;
use super::{ChatClient, ChatRequest, CompletionResponse};
use crate::llm::LlmConfig;

pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Groq exposes the OpenAI chat dialect under `/openai/v1`.
pub struct GroqChatClient {
    inner: OpenAIChatClient,
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let inner = OpenAIChatClient::with_route(
            api_key,
            model.unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            base_url.unwrap_or_else(|| "https://api.groq.com".to_string()),
            "/openai/v1/chat/completions",
        )?;
        Ok(Self { inner })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Groq API key is required".to_string())?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn complete(
        &self,
        request: ChatRequest
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        self.inner.complete(request).await
    }

    fn get_model(&self) -> String {
        self.inner.get_model()
    }

    fn get_base_url(&self) -> Option<String> {
        self.inner.get_base_url()
    }
}
