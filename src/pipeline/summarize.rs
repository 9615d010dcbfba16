use async_trait::async_trait;
use log::{ info, warn };
use serde::Deserialize;
use std::sync::Arc;

use super::enrich::PageContent;
use super::normalize::CandidatePaper;
use super::structured::{ flexible_authors, parse_structured, Validate };
use super::{ Node, PipelineError };
use crate::config::prompt::PromptConfig;
use crate::llm::chat::{ ChatClient, ChatRequest };
use crate::models::Message;
use crate::vector::VectorIndex;

pub const NO_CONTEXT: &str = "No additional context found.";

/// A candidate paper as it moves through enrichment and summarization.
#[derive(Debug, Clone)]
pub struct WorkingPaper {
    pub candidate: CandidatePaper,
    /// Set by enrichment, dropped again once the paper is summarized.
    pub content: Option<PageContent>,
    pub inferred_authors: Vec<String>,
    pub summary: Option<String>,
    pub error: Option<String>,
}

impl WorkingPaper {
    pub fn new(candidate: CandidatePaper) -> Self {
        Self {
            candidate,
            content: None,
            inferred_authors: Vec::new(),
            summary: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummarizeState {
    pub topic: String,
    pub papers: Vec<WorkingPaper>,
}

impl SummarizeState {
    pub fn new(topic: impl Into<String>, candidates: Vec<CandidatePaper>) -> Self {
        Self {
            topic: topic.into(),
            papers: candidates.into_iter().map(WorkingPaper::new).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaperSummary {
    #[serde(default, deserialize_with = "flexible_authors")]
    authors: Vec<String>,
    summary: String,
}

impl Validate for PaperSummary {
    fn validate(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() { Err("summary is empty".into()) } else { Ok(()) }
    }
}

pub struct SummarizeNode {
    chat: Arc<dyn ChatClient>,
    index: Arc<dyn VectorIndex>,
    prompts: Arc<PromptConfig>,
    retrieval_k: usize,
    temperature: f32,
}

impl SummarizeNode {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        index: Arc<dyn VectorIndex>,
        prompts: Arc<PromptConfig>,
        retrieval_k: usize,
        temperature: f32
    ) -> Self {
        Self { chat, index, prompts, retrieval_k, temperature }
    }

    async fn retrieve_context(&self, content: &str) -> String {
        match self.index.similarity_search(content, self.retrieval_k).await {
            Ok(hits) if !hits.is_empty() => {
                hits.into_iter()
                    .map(|hit| hit.document.text)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
            Ok(_) => NO_CONTEXT.to_string(),
            Err(e) => {
                warn!("Context retrieval failed: {}", e);
                NO_CONTEXT.to_string()
            }
        }
    }

    async fn summarize(&self, paper: &WorkingPaper) -> Result<PaperSummary, String> {
        let content = paper.content.as_ref().map(PageContent::text).unwrap_or_default();
        let context = self.retrieve_context(content).await;

        let request = ChatRequest::new(
            vec![
                Message::system(self.prompts.summarize_system.clone()),
                Message::user(
                    self.prompts.summarize_user_prompt(
                        &paper.candidate.title,
                        &paper.candidate.snippet,
                        content,
                        &context
                    )
                )
            ]
        )
            .with_temperature(self.temperature)
            .json();

        let reply = self.chat.complete(request).await.map_err(|e| format!("model call failed: {}", e))?;
        parse_structured::<PaperSummary>(&reply.response).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl Node<SummarizeState> for SummarizeNode {
    fn name(&self) -> &'static str {
        "summarize_papers"
    }

    async fn run(&self, mut state: SummarizeState) -> Result<SummarizeState, PipelineError> {
        for idx in 0..state.papers.len() {
            match self.summarize(&state.papers[idx]).await {
                Ok(summary) => {
                    let paper = &mut state.papers[idx];
                    paper.inferred_authors = summary.authors;
                    paper.summary = Some(summary.summary);
                    paper.content = None;
                }
                Err(e) => {
                    let paper = &mut state.papers[idx];
                    warn!("Could not summarize '{}': {}", paper.candidate.title, e);
                    paper.error = Some(e);
                }
            }
        }

        let failed = state.papers
            .iter()
            .filter(|p| p.error.is_some())
            .count();
        info!(
            "Summarized {} of {} paper(s) on '{}'",
            state.papers.len() - failed,
            state.papers.len(),
            state.topic
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ HashingEmbedder, ScriptedChat };
    use crate::vector::{ IndexedDocument, MemoryIndex };

    fn enriched(title: &str, content: PageContent) -> WorkingPaper {
        let mut paper = WorkingPaper::new(CandidatePaper {
            title: title.to_string(),
            link: format!("https://{}.test", title),
            snippet: format!("{} snippet", title),
            authors: vec!["Scraped Author".to_string()],
            year: Some(2020),
        });
        paper.content = Some(content);
        paper
    }

    fn node(chat: Arc<ScriptedChat>, index: Arc<MemoryIndex>) -> SummarizeNode {
        SummarizeNode::new(chat, index, Arc::new(PromptConfig::default()), 3, 0.7)
    }

    #[tokio::test]
    async fn successful_summary_drops_content() {
        let index = Arc::new(MemoryIndex::new(Arc::new(HashingEmbedder::new())));
        index
            .add_texts(vec![IndexedDocument::new("pedestrian crossing displays").with_metadata("source", "x")]).await
            .unwrap();
        let chat = Arc::new(
            ScriptedChat::new([r#"{"authors": ["A Author", "B Author"], "summary": "Displays help pedestrians."}"#])
        );

        let state = SummarizeState {
            topic: "eHMI".into(),
            papers: vec![enriched("p1", PageContent::Extracted("pedestrian crossing displays".into()))],
        };
        let state = node(chat.clone(), index).run(state).await.unwrap();

        let paper = &state.papers[0];
        assert_eq!(paper.summary.as_deref(), Some("Displays help pedestrians."));
        assert_eq!(paper.inferred_authors, vec!["A Author", "B Author"]);
        assert!(paper.content.is_none());
        assert!(paper.error.is_none());

        let request = chat.last_request().unwrap();
        assert!(request.json_output);
        assert!(request.messages[1].content.contains("Context: pedestrian crossing displays"));
    }

    #[tokio::test]
    async fn empty_index_uses_fallback_context() {
        let index = Arc::new(MemoryIndex::new(Arc::new(HashingEmbedder::new())));
        let chat = Arc::new(ScriptedChat::new([r#"{"authors": [], "summary": "s"}"#]));
        let state = SummarizeState {
            topic: "t".into(),
            papers: vec![enriched("p", PageContent::Placeholder("No URL provided".into()))],
        };
        node(chat.clone(), index).run(state).await.unwrap();
        let prompt = &chat.last_request().unwrap().messages[1].content;
        assert!(prompt.contains(&format!("Context: {}", NO_CONTEXT)));
        assert!(prompt.contains("Content: No URL provided"));
    }

    #[tokio::test]
    async fn failures_mark_only_the_affected_paper() {
        let index = Arc::new(MemoryIndex::new(Arc::new(HashingEmbedder::new())));
        let chat = Arc::new(ScriptedChat::new(["no json here"]));
        chat.push_failure("upstream 503");
        let state = SummarizeState {
            topic: "t".into(),
            papers: vec![
                enriched("bad-json", PageContent::Extracted("one".into())),
                enriched("down", PageContent::Extracted("two".into()))
            ],
        };
        let state = node(chat, index).run(state).await.unwrap();

        assert!(state.papers[0].error.as_deref().unwrap().contains("no JSON payload"));
        assert!(state.papers[1].error.as_deref().unwrap().contains("upstream 503"));
        assert!(state.papers.iter().all(|p| p.summary.is_none() && p.content.is_some()));
    }
}
