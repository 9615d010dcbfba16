//! Google Scholar result-page scraping.

use log::{ info, warn };
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ ElementRef, Html, Selector };
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ browser_headers, random_user_agent, WebFetcher };

static RESULT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.gs_ri").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.gs_rt").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static BYLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.gs_a").expect("valid selector"));
static SNIPPET: Lazy<Selector> = Lazy::new(|| Selector::parse("div.gs_rs").expect("valid selector"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));

pub const NO_RESULTS: &str = "No results found.";

/// One search hit with heuristically parsed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScholarResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub authors: String,
    pub year: String,
}

/// Parsed hits plus the text handed to the normalizer.
///
/// When the page could not be fetched or parsed, `results` is empty and
/// `raw_text` holds the placeholder describing why.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<ScholarResult>,
    pub raw_text: String,
}

impl SearchOutcome {
    fn placeholder(text: String) -> Self {
        Self { results: Vec::new(), raw_text: text }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(scope: ElementRef<'_>, selector: &Selector, fallback: &str) -> String {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<ScholarResult> {
    let document = Html::parse_document(html);

    document
        .select(&RESULT)
        .take(max_results)
        .map(|block| {
            let title_el = block.select(&TITLE).next();
            let title = title_el
                .map(element_text)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "No title".to_string());
            let link = title_el
                .and_then(|t| t.select(&TITLE_LINK).next())
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
                .unwrap_or_else(|| "No link".to_string());
            let authors = first_text(block, &BYLINE, "No authors");
            let year = YEAR.find_iter(&authors)
                .last()
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "No year".to_string());
            let snippet = first_text(block, &SNIPPET, "No snippet");

            ScholarResult { title, link, snippet, authors, year }
        })
        .collect()
}

pub fn render_results(results: &[ScholarResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            format!(
                "{}. {}\nLink: {}\nSnippet: {}\nAuthors: {}\nYear: {}",
                idx + 1,
                r.title,
                r.link,
                r.snippet,
                r.authors,
                r.year
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Queries the result page for `topic`. Failures never escape; they become placeholder text.
pub async fn search(
    fetcher: &dyn WebFetcher,
    base_url: &str,
    topic: &str,
    max_results: usize
) -> SearchOutcome {
    let url = match Url::parse_with_params(base_url, &[("q", topic)]) {
        Ok(url) => url,
        Err(e) => {
            warn!("Invalid search URL '{}': {}", base_url, e);
            return SearchOutcome::placeholder(format!("Exception during scraping: {}", e));
        }
    };

    let headers = browser_headers(random_user_agent());
    let page = match fetcher.fetch(url.as_str(), &headers).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Search request for '{}' failed: {}", topic, e);
            return SearchOutcome::placeholder(format!("Exception during scraping: {}", e));
        }
    };

    if !page.is_success() {
        warn!("Search for '{}' returned status {}", topic, page.status);
        return SearchOutcome::placeholder(format!("Error: Received status code {}", page.status));
    }

    let results = parse_results(&page.text(), max_results);
    info!("Search for '{}' yielded {} result(s)", topic, results.len());
    let raw_text = render_results(&results);
    SearchOutcome { results, raw_text }
}

#[cfg(test)]
pub(crate) const SAMPLE_PAGE: &str = r#"
<html><body>
<div class="gs_r">
  <div class="gs_ri">
    <h3 class="gs_rt"><a href="https://www.mdpi.com/1424-8220/21/9/2912">eHMI: Review and guidelines for deployment on autonomous vehicles</a></h3>
    <div class="gs_a">C Guindel, F Garcia, A De La Escalera - Sensors, 2021 - mdpi.com</div>
    <div class="gs_rs">This paper reviews external human-machine interfaces.</div>
  </div>
</div>
<div class="gs_r">
  <div class="gs_ri">
    <h3 class="gs_rt"><span>[CITATION]</span> Survey of eHMI concepts</h3>
    <div class="gs_a">P Bazilinskyy, D Dodou, J De Winter - Transportation research, 2019</div>
  </div>
</div>
</body></html>
"#;
