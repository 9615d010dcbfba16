mod memory;
mod qdrant;

pub use memory::{ cosine_similarity, MemoryIndex };
pub use qdrant::QdrantIndex;

use async_trait::async_trait;
use log::info;
use serde::{ Deserialize, Serialize };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::llm::embedding::EmbeddingClient;

/// A piece of text plus string metadata, as handed to an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IndexedDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), metadata: HashMap::new() }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub score: f32,
    pub document: IndexedDocument,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds and stores every document.
    async fn add_texts(&self, docs: Vec<IndexedDocument>) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Returns up to `k` documents ordered by descending cosine similarity.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize
    ) -> Result<Vec<ScoredDocument>, Box<dyn Error + Send + Sync>>;
}

pub fn create_paper_index(
    args: &Args,
    embedding_client: Arc<dyn EmbeddingClient>
) -> Result<Arc<dyn VectorIndex>, Box<dyn Error + Send + Sync>> {
    match args.vector_type.to_lowercase().as_str() {
        "memory" => {
            info!("Paper excerpts will be indexed in process memory");
            Ok(Arc::new(MemoryIndex::new(embedding_client)))
        }
        "qdrant" => {
            info!(
                "Paper excerpts will be indexed in Qdrant collection '{}' at {}",
                args.vector_collection,
                args.vector_host
            );
            let index = QdrantIndex::new(
                &args.vector_host,
                args.vector_secret.clone(),
                args.vector_collection.clone(),
                args.dimension as u64,
                embedding_client
            )?;
            Ok(Arc::new(index))
        }
        other => Err(format!("Unsupported vector index type: {}", other).into()),
    }
}
