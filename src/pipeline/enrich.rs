use async_trait::async_trait;
use log::{ debug, info, warn };
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use super::summarize::SummarizeState;
use super::{ Node, PipelineError };
use crate::scrape::extract::{ extract_relevant_sections, pdf_text, visible_text };
use crate::scrape::{ browser_headers, random_user_agent, FetchedPage, WebFetcher };
use crate::vector::{ IndexedDocument, VectorIndex };

pub const NO_URL: &str = "No URL provided";

/// What fetching one paper produced. Only `Extracted` text is indexed.
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Extracted(String),
    Placeholder(String),
}

impl PageContent {
    pub fn text(&self) -> &str {
        match self {
            PageContent::Extracted(text) | PageContent::Placeholder(text) => text,
        }
    }
}

/// Fetches each candidate's page, cuts it to the relevant sections and indexes it.
pub struct EnrichNode {
    fetcher: Arc<dyn WebFetcher>,
    index: Arc<dyn VectorIndex>,
    delay_ms: (u64, u64),
}

impl EnrichNode {
    pub fn new(fetcher: Arc<dyn WebFetcher>, index: Arc<dyn VectorIndex>, delay_ms: (u64, u64)) -> Self {
        let (lo, hi) = delay_ms;
        Self { fetcher, index, delay_ms: (lo.min(hi), lo.max(hi)) }
    }

    async fn politeness_delay(&self) {
        let (lo, hi) = self.delay_ms;
        if hi == 0 {
            return;
        }
        let millis = rand::rng().random_range(lo..=hi);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    async fn fetch_content(&self, link: &str) -> PageContent {
        self.politeness_delay().await;

        let headers = browser_headers(random_user_agent());
        match self.fetcher.fetch(link, &headers).await {
            Ok(page) => page_content(page).await,
            Err(e) => {
                warn!("Fetching {} failed: {}", link, e);
                PageContent::Placeholder(format!("Exception: {}", e))
            }
        }
    }
}

async fn page_content(page: FetchedPage) -> PageContent {
    if !page.is_success() {
        return PageContent::Placeholder(format!("Error: Received status code {}", page.status));
    }

    if page.is_pdf() {
        let body = page.body;
        // lopdf is synchronous and can be slow on large files.
        let parsed = tokio::task::spawn_blocking(move || pdf_text(&body)).await;
        return match parsed {
            Ok(Ok(text)) => PageContent::Extracted(extract_relevant_sections(&text)),
            Ok(Err(e)) => PageContent::Placeholder(format!("Error loading PDF: {}", e)),
            Err(e) => PageContent::Placeholder(format!("Error loading PDF: {}", e)),
        };
    }

    PageContent::Extracted(extract_relevant_sections(&visible_text(&page.text())))
}

#[async_trait]
impl Node<SummarizeState> for EnrichNode {
    fn name(&self) -> &'static str {
        "scrape_papers"
    }

    async fn run(&self, mut state: SummarizeState) -> Result<SummarizeState, PipelineError> {
        for paper in state.papers.iter_mut() {
            let content = match paper.candidate.fetchable_link() {
                None => PageContent::Placeholder(NO_URL.to_string()),
                Some(link) => self.fetch_content(link).await,
            };

            if let PageContent::Extracted(text) = &content {
                let doc = IndexedDocument::new(text.clone()).with_metadata(
                    "source",
                    paper.candidate.link.clone()
                );
                match self.index.add_texts(vec![doc]).await {
                    Ok(()) => debug!("Indexed excerpt of '{}'", paper.candidate.title),
                    Err(e) => warn!("Error adding '{}' to the paper index: {}", paper.candidate.title, e),
                }
            }

            paper.content = Some(content);
        }

        info!("Fetched content for {} paper(s) on '{}'", state.papers.len(), state.topic);
        Ok(state)
    }
}
