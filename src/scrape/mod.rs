pub mod extract;
pub mod scholar;

use async_trait::async_trait;
use log::debug;
use rand::seq::IndexedRandom;
use reqwest::header::{ HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE };
use std::error::Error;
use std::time::Duration;

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36",
];

/// The response of a single GET after redirects.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_pdf(&self) -> bool {
        let by_url = self.final_url
            .split(['?', '#'])
            .next()
            .map(|path| path.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        let by_type = self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/pdf"))
            .unwrap_or(false);
        by_url || by_type
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        headers: &[(&'static str, String)]
    ) -> Result<FetchedPage, Box<dyn Error + Send + Sync>>;
}

/// `reqwest`-backed fetcher sharing one connection pool across requests.
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl WebFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &[(&'static str, String)]
    ) -> Result<FetchedPage, Box<dyn Error + Send + Sync>> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            header_map.insert(HeaderName::from_static(*name), HeaderValue::from_str(value)?);
        }

        let resp = self.http.get(url).headers(header_map).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?.to_vec();

        debug!("GET {} -> {} ({} bytes, final url {})", url, status, body.len(), final_url);

        Ok(FetchedPage { status, final_url, content_type, body })
    }
}

pub fn random_user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
}

/// Header names must be lowercase for `HeaderName::from_static`.
pub fn browser_headers(user_agent: &str) -> Vec<(&'static str, String)> {
    vec![
        ("user-agent", user_agent.to_string()),
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string(),
        ),
        ("accept-language", "en-US,en;q=0.9".to_string()),
        ("referer", "https://scholar.google.com/".to_string()),
        ("upgrade-insecure-requests", "1".to_string()),
        ("sec-fetch-dest", "document".to_string()),
        ("sec-fetch-mode", "navigate".to_string()),
        ("sec-fetch-site", "same-origin".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str, content_type: Option<&str>) -> FetchedPage {
        FetchedPage {
            status: 200,
            final_url: url.to_string(),
            content_type: content_type.map(str::to_string),
            body: Vec::new(),
        }
    }

    #[test]
    fn pdf_detection_uses_url_or_content_type() {
        assert!(page("https://arxiv.org/pdf/1234.PDF", None).is_pdf());
        assert!(page("https://x.org/paper.pdf?download=1", None).is_pdf());
        assert!(page("https://x.org/download", Some("application/pdf")).is_pdf());
        assert!(!page("https://x.org/article", Some("text/html; charset=utf-8")).is_pdf());
    }

    #[test]
    fn headers_are_valid_static_names() {
        for (name, value) in browser_headers(random_user_agent()) {
            assert_eq!(name, name.to_ascii_lowercase());
            assert!(HeaderValue::from_str(&value).is_ok());
        }
    }

    #[test]
    fn user_agent_comes_from_pool() {
        assert!(USER_AGENTS.contains(&random_user_agent()));
    }
}
