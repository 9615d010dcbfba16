use async_trait::async_trait;
use log::{ debug, info };
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CreateCollectionBuilder,
    Distance,
    PointStruct,
    SearchPointsBuilder,
    UpsertPointsBuilder,
    VectorParams,
};
use qdrant_client::qdrant::vectors_config::Config as VectorsConfig;
use serde_json::{ Map, Value as JsonValue };
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::{ IndexedDocument, ScoredDocument, VectorIndex };
use crate::llm::embedding::EmbeddingClient;

const TEXT_KEY: &str = "text";

pub struct QdrantIndex {
    client: Qdrant,
    collection_name: String,
    vector_dim: u64,
    embedding_client: Arc<dyn EmbeddingClient>,
    collection_ready: OnceCell<()>,
}

impl QdrantIndex {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection_name: String,
        vector_dim: u64,
        embedding_client: Arc<dyn EmbeddingClient>
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Qdrant::from_url(url).api_key(api_key).build()?;
        Ok(Self {
            client,
            collection_name,
            vector_dim,
            embedding_client,
            collection_ready: OnceCell::new(),
        })
    }

    async fn ensure_collection_exists(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.collection_ready
            .get_or_try_init(|| async {
                if !self.client.collection_exists(&self.collection_name).await? {
                    let create_collection = CreateCollectionBuilder::new(self.collection_name.clone())
                        .vectors_config(
                            VectorsConfig::Params(VectorParams {
                                size: self.vector_dim,
                                distance: Distance::Cosine.into(),
                                ..Default::default()
                            })
                        )
                        .build();
                    self.client.create_collection(create_collection).await?;
                    info!(
                        "Created Qdrant collection '{}' with dimension {}",
                        self.collection_name,
                        self.vector_dim
                    );
                }
                Ok::<(), Box<dyn Error + Send + Sync>>(())
            }).await?;
        Ok(())
    }

    fn payload_for(doc: &IndexedDocument) -> Map<String, JsonValue> {
        let mut payload = Map::new();
        for (key, value) in &doc.metadata {
            payload.insert(key.clone(), JsonValue::String(value.clone()));
        }
        payload.insert(TEXT_KEY.to_string(), JsonValue::String(doc.text.clone()));
        payload
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn add_texts(&self, docs: Vec<IndexedDocument>) -> Result<(), Box<dyn Error + Send + Sync>> {
        if docs.is_empty() {
            return Ok(());
        }
        self.ensure_collection_exists().await?;

        let mut points = Vec::with_capacity(docs.len());
        for doc in &docs {
            let vector = self.embedding_client.embed(&doc.text).await?.embedding;
            if (vector.len() as u64) != self.vector_dim {
                return Err(
                    format!(
                        "Embedding dimension mismatch: expected {}, got {}",
                        self.vector_dim,
                        vector.len()
                    ).into()
                );
            }
            let point_id = Uuid::new_v4().to_string();
            points.push(PointStruct::new(point_id, vector, Self::payload_for(doc)));
        }

        let count = points.len();
        self.client.upsert_points(
            UpsertPointsBuilder::new(&self.collection_name, points).wait(true).build()
        ).await?;
        debug!("Upserted {} point(s) into '{}'", count, self.collection_name);
        Ok(())
    }

    async fn similarity_search(
        &self,
        query: &str,
        k: usize
    ) -> Result<Vec<ScoredDocument>, Box<dyn Error + Send + Sync>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_collection_exists().await?;
        let vector = self.embedding_client.embed(query).await?.embedding;

        let response = self.client.search_points(
            SearchPointsBuilder::new(&self.collection_name, vector, k as u64).with_payload(true)
        ).await?;

        let hits = response.result
            .into_iter()
            .map(|point| {
                let mut text = String::new();
                let mut metadata = HashMap::new();
                for (key, value) in point.payload {
                    let Some(s) = value.as_str() else {
                        continue;
                    };
                    if key == TEXT_KEY {
                        text = s.to_string();
                    } else {
                        metadata.insert(key, s.to_string());
                    }
                }
                ScoredDocument { score: point.score, document: IndexedDocument { text, metadata } }
            })
            .collect();

        Ok(hits)
    }
}
