use async_trait::async_trait;
use std::sync::Arc;

use super::normalize::CandidatePaper;
use super::{ Node, PipelineError };
use crate::scrape::scholar::{ self, SearchOutcome };
use crate::scrape::WebFetcher;

/// State carried through the scrape and normalize nodes.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub topic: String,
    pub outcome: Option<SearchOutcome>,
    pub candidates: Vec<CandidatePaper>,
}

impl SearchState {
    pub fn new(topic: impl Into<String>) -> Self {
        Self { topic: topic.into(), outcome: None, candidates: Vec::new() }
    }
}

pub struct ScrapeNode {
    fetcher: Arc<dyn WebFetcher>,
    search_url: String,
    max_results: usize,
}

impl ScrapeNode {
    pub fn new(fetcher: Arc<dyn WebFetcher>, search_url: impl Into<String>, max_results: usize) -> Self {
        Self { fetcher, search_url: search_url.into(), max_results }
    }
}

#[async_trait]
impl Node<SearchState> for ScrapeNode {
    fn name(&self) -> &'static str {
        "scrape_scholar"
    }

    async fn run(&self, mut state: SearchState) -> Result<SearchState, PipelineError> {
        let outcome = scholar::search(
            self.fetcher.as_ref(),
            &self.search_url,
            &state.topic,
            self.max_results
        ).await;
        state.outcome = Some(outcome);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::scholar::SAMPLE_PAGE;
    use crate::test_support::CannedFetcher;

    #[tokio::test]
    async fn scrape_node_fills_outcome() {
        let fetcher = Arc::new(
            CannedFetcher::new().with_html("https://scholar.test/scholar?q=eHMI", SAMPLE_PAGE)
        );
        let node = ScrapeNode::new(fetcher, "https://scholar.test/scholar", 1);
        let state = node.run(SearchState::new("eHMI")).await.unwrap();

        let outcome = state.outcome.unwrap();
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.raw_text.starts_with("1. eHMI: Review"));
        assert!(state.candidates.is_empty());
    }

    #[tokio::test]
    async fn unreachable_search_still_succeeds() {
        let node = ScrapeNode::new(Arc::new(CannedFetcher::new()), "https://scholar.test/scholar", 5);
        let state = node.run(SearchState::new("anything")).await.unwrap();
        let outcome = state.outcome.unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.raw_text.starts_with("Exception during scraping:"));
    }
}
