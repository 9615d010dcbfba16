use async_trait::async_trait;
use log::{ debug, info };
use std::sync::Arc;

use super::{ Node, PipelineError };
use crate::config::prompt::PromptConfig;
use crate::llm::chat::{ ChatClient, ChatRequest };
use crate::llm::embedding::EmbeddingClient;
use crate::models::{ Message, Paper };
use crate::vector::{ IndexedDocument, MemoryIndex, VectorIndex };

#[derive(Debug, Clone)]
pub struct QnaState {
    pub topic: String,
    pub papers: Vec<Paper>,
    pub query: String,
    pub history: Vec<Message>,
    pub answer: Option<String>,
}

impl QnaState {
    pub fn new(topic: impl Into<String>, papers: Vec<Paper>, history: Vec<Message>, query: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            papers,
            query: query.into(),
            history,
            answer: None,
        }
    }
}

/// The text a paper is retrieved by during Q&A.
pub fn paper_document(paper: &Paper) -> IndexedDocument {
    let text = format!(
        "Title: {}\nSummary: {}\nAuthors: {}\nLink: {}",
        paper.title,
        paper.summary,
        paper.authors.join(", "),
        paper.link
    );
    IndexedDocument::new(text)
        .with_metadata("paper_id", paper.id.clone())
        .with_metadata("link", paper.link.clone())
}

/// Answers one question against a throwaway index of the topic's papers.
pub struct QnaNode {
    chat: Arc<dyn ChatClient>,
    embedding_client: Arc<dyn EmbeddingClient>,
    prompts: Arc<PromptConfig>,
    retrieval_k: usize,
    temperature: f32,
}

impl QnaNode {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        embedding_client: Arc<dyn EmbeddingClient>,
        prompts: Arc<PromptConfig>,
        retrieval_k: usize,
        temperature: f32
    ) -> Self {
        Self { chat, embedding_client, prompts, retrieval_k, temperature }
    }

    async fn retrieve_context(&self, papers: &[Paper], query: &str) -> Result<String, PipelineError> {
        let docs = papers.iter().map(paper_document).collect();
        let index = MemoryIndex::from_texts(self.embedding_client.clone(), docs).await.map_err(|e|
            PipelineError::Retrieval(e.to_string())
        )?;
        let hits = index
            .similarity_search(query, self.retrieval_k).await
            .map_err(|e| PipelineError::Retrieval(e.to_string()))?;
        debug!("Retrieved {} of {} paper(s) as context", hits.len(), papers.len());

        Ok(
            hits
                .into_iter()
                .map(|hit| hit.document.text)
                .collect::<Vec<_>>()
                .join("\n\n")
        )
    }
}

#[async_trait]
impl Node<QnaState> for QnaNode {
    fn name(&self) -> &'static str {
        "qna"
    }

    async fn run(&self, mut state: QnaState) -> Result<QnaState, PipelineError> {
        if state.papers.is_empty() {
            info!("Topic '{}' has no papers, answering without the model", state.topic);
            state.answer = Some(self.prompts.no_context_answer.clone());
            return Ok(state);
        }
        if state.query.trim().is_empty() {
            info!("Blank question for topic '{}', answering without retrieval", state.topic);
            state.answer = Some(self.prompts.empty_question_answer.clone());
            return Ok(state);
        }

        let context = self.retrieve_context(&state.papers, &state.query).await?;

        if state.history.is_empty() {
            state.history.push(Message::system(self.prompts.qna_system_prompt(&state.topic)));
        }

        let mut messages = state.history.clone();
        messages.push(Message::user(self.prompts.qna_user_prompt(&context, &state.query)));
        let request = ChatRequest::new(messages).with_temperature(self.temperature);

        let reply = self.chat.complete(request).await.map_err(|e| PipelineError::Model {
            stage: "question answering",
            message: e.to_string(),
        })?;

        state.history.push(Message::user(state.query.clone()));
        state.history.push(Message::assistant(reply.response.clone()));
        state.answer = Some(reply.response);
        Ok(state)
    }
}
