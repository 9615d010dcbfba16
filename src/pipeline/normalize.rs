use async_trait::async_trait;
use log::{ info, warn };
use serde::{ Deserialize, Serialize };
use std::sync::Arc;

use super::search::SearchState;
use super::structured::{ flexible_authors, flexible_year, null_as_empty, parse_structured, Validate };
use super::{ Node, PipelineError };
use crate::config::prompt::PromptConfig;
use crate::llm::chat::{ ChatClient, ChatRequest };
use crate::models::Message;

/// A cleaned search hit as returned by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePaper {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub snippet: String,
    #[serde(default, deserialize_with = "flexible_authors")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "flexible_year")]
    pub year: Option<i32>,
}

impl CandidatePaper {
    /// The link to fetch, unless the search placeholder or nothing was given.
    pub fn fetchable_link(&self) -> Option<&str> {
        let link = self.link.trim();
        if link.is_empty() || link == "No link" { None } else { Some(link) }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NormalizedReply {
    Wrapped {
        papers: Vec<CandidatePaper>,
    },
    Bare(Vec<CandidatePaper>),
}

impl NormalizedReply {
    fn into_papers(self) -> Vec<CandidatePaper> {
        match self {
            NormalizedReply::Wrapped { papers } => papers,
            NormalizedReply::Bare(papers) => papers,
        }
    }
}

impl Validate for NormalizedReply {
    fn validate(&self) -> Result<(), String> {
        let papers = match self {
            NormalizedReply::Wrapped { papers } => papers,
            NormalizedReply::Bare(papers) => papers,
        };
        match papers.iter().position(|p| p.title.trim().is_empty()) {
            Some(idx) => Err(format!("paper #{} has an empty title", idx + 1)),
            None => Ok(()),
        }
    }
}

pub struct NormalizeNode {
    chat: Arc<dyn ChatClient>,
    prompts: Arc<PromptConfig>,
    max_results: usize,
    temperature: f32,
}

impl NormalizeNode {
    pub fn new(
        chat: Arc<dyn ChatClient>,
        prompts: Arc<PromptConfig>,
        max_results: usize,
        temperature: f32
    ) -> Self {
        Self { chat, prompts, max_results, temperature }
    }
}

#[async_trait]
impl Node<SearchState> for NormalizeNode {
    fn name(&self) -> &'static str {
        "clean_scraped_data"
    }

    async fn run(&self, mut state: SearchState) -> Result<SearchState, PipelineError> {
        let raw_text = match &state.outcome {
            Some(outcome) if !outcome.results.is_empty() => outcome.raw_text.clone(),
            _ => {
                info!("No search results for '{}', skipping normalization", state.topic);
                state.candidates.clear();
                return Ok(state);
            }
        };

        let request = ChatRequest::new(
            vec![
                Message::system(self.prompts.normalize_system.clone()),
                Message::user(self.prompts.normalize_user_prompt(&raw_text, self.max_results))
            ]
        )
            .with_temperature(self.temperature)
            .json();

        let reply = self.chat.complete(request).await.map_err(|e| PipelineError::Model {
            stage: "normalization",
            message: e.to_string(),
        })?;

        let parsed = parse_structured::<NormalizedReply>(&reply.response).map_err(|e| {
            warn!("Normalization reply rejected: {}", e);
            PipelineError::Normalization(e)
        })?;

        let mut papers = parsed.into_papers();
        papers.truncate(self.max_results);
        info!("Normalized {} candidate paper(s) for '{}'", papers.len(), state.topic);
        state.candidates = papers;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::scholar::{ parse_results, render_results, SearchOutcome, SAMPLE_PAGE };
    use crate::test_support::ScriptedChat;

    fn scraped_state() -> SearchState {
        let results = parse_results(SAMPLE_PAGE, 5);
        let raw_text = render_results(&results);
        let mut state = SearchState::new("eHMI");
        state.outcome = Some(SearchOutcome { results, raw_text });
        state
    }

    fn node(chat: Arc<ScriptedChat>, max_results: usize) -> NormalizeNode {
        NormalizeNode::new(chat, Arc::new(PromptConfig::default()), max_results, 0.7)
    }

    #[tokio::test]
    async fn wrapped_reply_becomes_candidates() {
        let chat = Arc::new(
            ScriptedChat::new([
                r#"{"papers": [
                    {"title": "eHMI review", "link": "https://www.mdpi.com/1424-8220/21/9/2912",
                     "snippet": "Reviews eHMI.", "authors": ["C Guindel", "F Garcia"], "year": 2021},
                    {"title": "Survey of eHMI concepts", "link": null, "authors": "P Bazilinskyy, D Dodou", "year": "2019"}
                ]}"#,
            ])
        );
        let state = node(chat.clone(), 5).run(scraped_state()).await.unwrap();

        assert_eq!(state.candidates.len(), 2);
        assert_eq!(state.candidates[0].year, Some(2021));
        assert_eq!(state.candidates[1].authors, vec!["P Bazilinskyy", "D Dodou"]);
        assert_eq!(state.candidates[1].fetchable_link(), None);

        let request = chat.last_request().unwrap();
        assert!(request.json_output);
        assert!(request.messages[1].content.contains("Authors: C Guindel"));
    }

    #[tokio::test]
    async fn bare_array_is_truncated() {
        let chat = Arc::new(
            ScriptedChat::new([
                "```json\n[{\"title\": \"A\"}, {\"title\": \"B\"}, {\"title\": \"C\"}]\n```",
            ])
        );
        let state = node(chat, 2).run(scraped_state()).await.unwrap();
        let titles: Vec<_> = state.candidates.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn prose_reply_is_a_normalization_error() {
        let chat = Arc::new(ScriptedChat::new(["Here are the papers you asked about!"]));
        let err = node(chat, 5).run(scraped_state()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Normalization(_)));
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let chat = Arc::new(ScriptedChat::new([r#"{"papers": [{"title": " "}]}"#]));
        let err = node(chat, 5).run(scraped_state()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Normalization(_)));
    }

    #[tokio::test]
    async fn no_results_skips_the_model() {
        let chat = Arc::new(ScriptedChat::new(Vec::<String>::new()));
        let mut state = SearchState::new("nothing");
        state.outcome = Some(SearchOutcome { results: Vec::new(), raw_text: "No results found.".into() });

        let state = node(chat.clone(), 5).run(state).await.unwrap();
        assert!(state.candidates.is_empty());
        assert_eq!(chat.request_count(), 0);
    }

    #[tokio::test]
    async fn chat_failure_is_a_model_error() {
        let chat = Arc::new(ScriptedChat::new(Vec::<String>::new()));
        chat.push_failure("rate limited");
        let err = node(chat, 5).run(scraped_state()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Model { stage: "normalization", .. }));
    }
}
