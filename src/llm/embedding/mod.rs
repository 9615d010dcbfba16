pub mod provider;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use log::{ info, warn };

use super::{ LlmConfig, LlmType };
use self::provider::RllmEmbeddingClient;

#[derive(Debug, Clone)]
pub struct EmbeddingResponse {
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, Box<dyn StdError + Send + Sync>>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn EmbeddingClient>, Box<dyn StdError + Send + Sync>> {
    if config.llm_type == LlmType::Groq {
        warn!("Groq does not serve embedding models; use EMBEDDING_LLM_TYPE=ollama or openai.");
    }
    let client = RllmEmbeddingClient::from_config(config)?;
    info!("Embedding model: {}", client.model());
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groq_embeddings_are_rejected() {
        let config = LlmConfig { llm_type: LlmType::Groq, ..Default::default() };
        assert!(new_client(&config).is_err());
    }

    #[test]
    fn openai_embeddings_need_a_key() {
        let config = LlmConfig { llm_type: LlmType::OpenAI, ..Default::default() };
        assert!(new_client(&config).is_err());
    }
}
