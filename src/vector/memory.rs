use async_trait::async_trait;
use std::cmp::Ordering;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{ IndexedDocument, ScoredDocument, VectorIndex };
use crate::llm::embedding::EmbeddingClient;

/// Brute-force cosine index kept entirely in process.
pub struct MemoryIndex {
    embedding_client: Arc<dyn EmbeddingClient>,
    entries: RwLock<Vec<(IndexedDocument, Vec<f32>)>>,
}

impl MemoryIndex {
    pub fn new(embedding_client: Arc<dyn EmbeddingClient>) -> Self {
        Self { embedding_client, entries: RwLock::new(Vec::new()) }
    }

    /// Builds an index and loads `docs` into it in one step.
    pub async fn from_texts(
        embedding_client: Arc<dyn EmbeddingClient>,
        docs: Vec<IndexedDocument>
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let index = Self::new(embedding_client);
        index.add_texts(docs).await?;
        Ok(index)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Cosine similarity; 0.0 when either vector has no magnitude or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add_texts(&self, docs: Vec<IndexedDocument>) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut embedded = Vec::with_capacity(docs.len());
        for doc in docs {
            let vector = self.embedding_client.embed(&doc.text).await?.embedding;
            embedded.push((doc, vector));
        }
        self.entries.write().await.extend(embedded);
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize
    ) -> Result<Vec<ScoredDocument>, Box<dyn Error + Send + Sync>> {
        if k == 0 || self.is_empty().await {
            return Ok(Vec::new());
        }
        let query_vector = self.embedding_client.embed(query).await?.embedding;

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredDocument> = entries
            .iter()
            .map(|(doc, vector)| ScoredDocument {
                score: cosine_similarity(&query_vector, vector),
                document: doc.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
