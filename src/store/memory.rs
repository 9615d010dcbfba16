use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::RwLock;

use super::{ sort_summaries, TopicStore };
use crate::models::{ Topic, TopicSummary };

pub struct MemoryTopicStore {
    topics: RwLock<HashMap<String, Topic>>,
}

impl MemoryTopicStore {
    pub fn new() -> Self {
        Self { topics: RwLock::new(HashMap::new()) }
    }
}

impl Default for MemoryTopicStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicStore for MemoryTopicStore {
    async fn put_topic(&self, topic: &Topic) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.topics.write().await.insert(topic.id.clone(), topic.clone());
        Ok(())
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, Box<dyn Error + Send + Sync>> {
        Ok(self.topics.read().await.get(topic_id).cloned())
    }

    async fn list_topics(&self) -> Result<Vec<TopicSummary>, Box<dyn Error + Send + Sync>> {
        let mut summaries: Vec<TopicSummary> = self.topics
            .read().await
            .values()
            .map(Topic::summary)
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites_and_get_reads_back() {
        let store = MemoryTopicStore::new();
        let mut topic = Topic::new("eHMI");
        store.put_topic(&topic).await.unwrap();

        topic.title = "eHMI design".into();
        store.put_topic(&topic).await.unwrap();

        let loaded = store.get_topic(&topic.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "eHMI design");
        assert!(store.get_topic("missing").await.unwrap().is_none());
        assert_eq!(store.list_topics().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listing_is_sorted() {
        let store = MemoryTopicStore::new();
        for title in ["robotics", "NLP", "eHMI"] {
            store.put_topic(&Topic::new(title)).await.unwrap();
        }
        let titles: Vec<_> = store
            .list_topics().await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["NLP", "eHMI", "robotics"]);
    }
}
