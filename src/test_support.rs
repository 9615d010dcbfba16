//! Hand-written collaborators shared by unit tests.

use async_trait::async_trait;
use std::collections::{ HashMap, VecDeque };
use std::error::Error;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Mutex;

use crate::llm::chat::{ ChatClient, ChatRequest, CompletionResponse };
use crate::llm::embedding::{ EmbeddingClient, EmbeddingResponse };
use crate::scrape::{ FetchedPage, WebFetcher };

/// Deterministic bag-of-words embedder: one bucket per hashed lowercase token.
pub struct HashingEmbedder {
    pub calls: AtomicUsize,
}

impl HashingEmbedder {
    pub fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingResponse, Box<dyn Error + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut embedding = vec![0.0f32; 64];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let bucket = token
                .to_lowercase()
                .bytes()
                .fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
            embedding[(bucket % 64) as usize] += 1.0;
        }
        Ok(EmbeddingResponse { embedding })
    }
}

/// Replays queued replies in order and records every request it saw.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new<I, S>(replies: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_failure(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(
        &self,
        request: ChatRequest
    ) -> Result<CompletionResponse, Box<dyn Error + Send + Sync>> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(CompletionResponse { response }),
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted reply left".into()),
        }
    }

    fn get_model(&self) -> String {
        "scripted".to_string()
    }

    fn get_base_url(&self) -> Option<String> {
        None
    }
}

/// Serves fixed pages by exact URL; anything else is a transport error.
pub struct CannedFetcher {
    pages: HashMap<String, FetchedPage>,
    pub fetched: Mutex<Vec<String>>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self { pages: HashMap::new(), fetched: Mutex::new(Vec::new()) }
    }

    pub fn with_page(mut self, url: &str, page: FetchedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    pub fn with_html(self, url: &str, html: &str) -> Self {
        let page = FetchedPage {
            status: 200,
            final_url: url.to_string(),
            content_type: Some("text/html; charset=utf-8".to_string()),
            body: html.as_bytes().to_vec(),
        };
        self.with_page(url, page)
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        let page = FetchedPage {
            status,
            final_url: url.to_string(),
            content_type: None,
            body: Vec::new(),
        };
        self.with_page(url, page)
    }
}

#[async_trait]
impl WebFetcher for CannedFetcher {
    async fn fetch(
        &self,
        url: &str,
        _headers: &[(&'static str, String)]
    ) -> Result<FetchedPage, Box<dyn Error + Send + Sync>> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| format!("connection refused: {}", url).into())
    }
}
