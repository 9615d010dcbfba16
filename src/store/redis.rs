use async_trait::async_trait;
use log::error;
use redis::{ AsyncCommands, Client };
use std::error::Error;

use super::{ sort_summaries, TopicStore };
use crate::models::{ Topic, TopicSummary };

/// One JSON string per topic at `{prefix}{topic_id}`.
pub struct RedisTopicStore {
    client: Client,
    key_prefix: String,
}

impl RedisTopicStore {
    pub fn new(url: &str, key_prefix: String) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(url)?,
            key_prefix,
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }

    fn key(&self, topic_id: &str) -> String {
        format!("{}{}", self.key_prefix, topic_id)
    }
}

#[async_trait]
impl TopicStore for RedisTopicStore {
    async fn put_topic(&self, topic: &Topic) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let json = serde_json::to_string(topic)?;
        conn.set::<_, _, ()>(self.key(&topic.id), json).await?;
        Ok(())
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let json: Option<String> = conn.get(self.key(topic_id)).await?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list_topics(&self) -> Result<Vec<TopicSummary>, Box<dyn Error + Send + Sync>> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", self.key_prefix)).await?;

        let mut summaries = Vec::with_capacity(keys.len());
        for key in keys {
            let json: Option<String> = conn.get(&key).await?;
            let Some(json) = json else {
                continue;
            };
            match serde_json::from_str::<TopicSummary>(&json) {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!("Skipping unreadable topic record at {}: {}", key, e),
            }
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_prefix() {
        let store = RedisTopicStore::new("redis://127.0.0.1:6379", "topics:".into()).unwrap();
        assert_eq!(store.key("abc"), "topics:abc");
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(RedisTopicStore::new("not a url", "topics:".into()).is_err());
    }
}
