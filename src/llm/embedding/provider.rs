use async_trait::async_trait;
use rllm::{ builder::{ LLMBackend, LLMBuilder }, LLMProvider };
use std::error::Error as StdError;
use super::super::{ LlmConfig, LlmType };
use super::{ EmbeddingClient, EmbeddingResponse };

/// Embedding adapter for every backend `rllm` can embed with.
pub struct RllmEmbeddingClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    provider: &'static str,
    model: String,
}

impl RllmEmbeddingClient {
    pub fn ollama(
        base_url: Option<String>,
        model: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        let embed_model = model.unwrap_or_else(|| "nomic-embed-text".to_string());

        let llm = LLMBuilder::new()
            .backend(LLMBackend::Ollama)
            .base_url(url)
            .model(&embed_model)
            .stream(false)
            .build()?;

        Ok(Self { llm, provider: "Ollama", model: embed_model })
    }

    pub fn openai(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let embed_model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());

        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::OpenAI)
            .api_key(api_key)
            .model(&embed_model);

        if let Some(url) = base_url {
            builder = builder.base_url(url);
        }

        let llm = builder.build()?;

        Ok(Self { llm, provider: "OpenAI", model: embed_model })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        match config.llm_type {
            LlmType::Ollama => Self::ollama(config.base_url.clone(), config.embedding_model.clone()),
            LlmType::OpenAI => {
                let api_key = config.api_key
                    .clone()
                    .ok_or_else(|| "OpenAI API key is required for embeddings".to_string())?;
                Self::openai(api_key, config.embedding_model.clone(), config.base_url.clone())
            }
            LlmType::Groq => Err("Groq has no embedding endpoint".into()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingClient for RllmEmbeddingClient {
    async fn embed(
        &self,
        text: &str
    ) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>> {
        if text.trim().is_empty() {
            return Err(format!("{} embedding requested for empty text", self.provider).into());
        }
        let mut embeddings = self.llm.embed(vec![text.to_string()]).await?;
        let embedding = embeddings
            .pop()
            .ok_or_else(|| format!("{} embedding generation returned no results", self.provider))?;

        Ok(EmbeddingResponse { embedding })
    }
}
