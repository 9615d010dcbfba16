mod firestore;
mod memory;
mod redis;

pub use firestore::FirestoreTopicStore;
pub use memory::MemoryTopicStore;
pub use self::redis::RedisTopicStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;

use crate::cli::Args;
use crate::models::{ Topic, TopicSummary };

/// Persistence for topic records, keyed by topic id.
///
/// Writes replace the whole record. The store does not validate what it is
/// given, and concurrent writers to the same topic race with the last write winning.
#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn put_topic(&self, topic: &Topic) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, Box<dyn Error + Send + Sync>>;

    /// Every stored topic as id and title, ordered by title and then id.
    async fn list_topics(&self) -> Result<Vec<TopicSummary>, Box<dyn Error + Send + Sync>>;
}

pub(crate) fn sort_summaries(summaries: &mut [TopicSummary]) {
    summaries.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
}

pub fn create_topic_store(args: &Args) -> Result<Arc<dyn TopicStore>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "memory" => {
            info!("Topics are kept in process memory and lost on restart");
            Ok(Arc::new(MemoryTopicStore::new()))
        }
        "redis" => {
            info!("Topics are stored in Redis under prefix '{}'", args.store_redis_prefix);
            let store = RedisTopicStore::new(&args.store_redis_url, args.store_redis_prefix.clone())?;
            Ok(Arc::new(store))
        }
        "firestore" => {
            let project_id = args.firestore_project_id
                .clone()
                .ok_or("FIRESTORE_PROJECT_ID is required when the store type is firestore")?;
            let sa_key_path = args.firestore_sa_key_path
                .clone()
                .ok_or("FIRESTORE_SA_KEY_PATH is required when the store type is firestore")?;
            info!(
                "Topics are stored in Firestore collection '{}' of project '{}'",
                args.firestore_collection,
                project_id
            );
            Ok(Arc::new(FirestoreTopicStore::new(project_id, sa_key_path, args.firestore_collection.clone())))
        }
        other => Err(format!("Unsupported topic store type: {}", other).into()),
    }
}
