use serde::{ Deserialize, Serialize };

use super::{ Topic, TopicSummary };

#[derive(Debug, Deserialize)]
pub struct TopicPost {
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryInput {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicResponse {
    pub topic: Topic,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicListResponse {
    pub topics: Vec<TopicSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QnaResponse {
    pub response: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
}
