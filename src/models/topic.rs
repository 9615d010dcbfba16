use serde::{ Deserialize, Serialize };
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub link: String,
    pub year: Option<i32>,
    pub topic_id: String,
}

/// A research subject together with its collected papers and Q&A log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub papers: Vec<Paper>,
    #[serde(default)]
    pub qna_history: Vec<Message>,
}

impl Topic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: new_record_id(),
            title: title.into(),
            papers: Vec::new(),
            qna_history: Vec::new(),
        }
    }

    /// Removes the first paper with `paper_id`; all other papers keep their order.
    pub fn remove_paper(&mut self, paper_id: &str) -> Option<Paper> {
        let pos = self.papers.iter().position(|p| p.id == paper_id)?;
        Some(self.papers.remove(pos))
    }

    pub fn summary(&self) -> TopicSummary {
        TopicSummary { id: self.id.clone(), title: self.title.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: String,
    pub title: String,
}

/// Opaque 32-char hex identifier shared by topics and papers.
pub fn new_record_id() -> String {
    Uuid::new_v4().simple().to_string()
}
