//! Turning fetched pages into the short excerpt that gets summarized.

use lopdf::Document;
use scraper::{ Html, Node };
use std::error::Error;

/// Pages shorter than this are kept whole.
pub const EXCERPT_THRESHOLD: usize = 3000;
/// Characters kept after each "abstract"/"conclusion" hit.
pub const SECTION_LEN: usize = 1000;

const BOILERPLATE_TAGS: &[&str] = &["header", "footer", "nav", "script", "style"];

/// Visible text of an HTML document, one text node per line, without page chrome.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let in_boilerplate = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(el) if BOILERPLATE_TAGS.contains(&el.name()))
        });
        if in_boilerplate {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }

    lines.join("\n")
}

/// Text of every page of an in-memory PDF, pages separated by newlines.
pub fn pdf_text(bytes: &[u8]) -> Result<String, Box<dyn Error + Send + Sync>> {
    let doc = Document::load_mem(bytes)?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err("PDF has no pages".into());
    }

    let mut text = String::new();
    for page in page_numbers {
        // Pages lopdf cannot decode are skipped.
        if let Ok(page_text) = doc.extract_text(&[page]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    if text.trim().is_empty() {
        return Err("No text content extracted from PDF".into());
    }
    Ok(text)
}

/// Picks the part of a paper worth summarizing.
///
/// Short texts pass through unchanged. Long ones are cut down to the first
/// "abstract" and the last "conclusion" (1000 chars each), falling back to the
/// first 3000 chars when neither keyword appears.
pub fn extract_relevant_sections(text: &str) -> String {
    if text.chars().count() < EXCERPT_THRESHOLD {
        return text.to_string();
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    let abstract_part = lower.find("abstract").map(|idx| take_chars(&text[idx..], SECTION_LEN));
    let conclusion_part = lower
        .rfind("conclusion")
        .map(|idx| take_chars(&text[idx..], SECTION_LEN));

    let mut result = String::new();
    if let Some(part) = abstract_part.filter(|p| !p.is_empty()) {
        result.push_str(&format!("Abstract: {}\n\n", part));
    }
    if let Some(part) = conclusion_part.filter(|p| !p.is_empty()) {
        result.push_str(&format!("Conclusion: {}", part));
    }

    if result.is_empty() {
        take_chars(text, EXCERPT_THRESHOLD)
    } else {
        result.trim().to_string()
    }
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_returned_whole() {
        let text = "Abstract: tiny paper. Conclusion: it works.";
        assert_eq!(extract_relevant_sections(text), text);
    }

    #[test]
    fn long_text_keeps_first_abstract_and_last_conclusion() {
        let filler = "lorem ipsum ".repeat(400);
        let text = format!(
            "{filler}ABSTRACT We study eHMI.{filler}conclusion (draft){filler}Conclusion: displays help.{filler}"
        );
        let excerpt = extract_relevant_sections(&text);

        assert!(excerpt.starts_with("Abstract: ABSTRACT We study eHMI."));
        assert!(excerpt.contains("\n\nConclusion: Conclusion: displays help."));
        assert!(!excerpt.contains("(draft)"));
        let abstract_body = excerpt.split("\n\n").next().unwrap();
        assert!(abstract_body.chars().count() <= SECTION_LEN + "Abstract: ".len());
    }

    #[test]
    fn long_text_without_keywords_is_truncated() {
        let text = "é".repeat(EXCERPT_THRESHOLD + 500);
        let excerpt = extract_relevant_sections(&text);
        assert_eq!(excerpt.chars().count(), EXCERPT_THRESHOLD);
    }

    #[test]
    fn only_conclusion_found() {
        let text = format!("{}Conclusions are drawn.", "x".repeat(EXCERPT_THRESHOLD));
        assert_eq!(extract_relevant_sections(&text), "Conclusion: Conclusions are drawn.");
    }

    #[test]
    fn visible_text_drops_page_chrome() {
        let html = r#"
            <html><head><style>body { color: red }</style><script>var x = 1;</script></head>
            <body>
              <header>Site banner</header>
              <nav><a href="/">Home</a></nav>
              <main><h1>eHMI review</h1><p>Abstract text here.</p></main>
              <footer>Copyright</footer>
            </body></html>"#;
        let text = visible_text(html);
        assert_eq!(text, "eHMI review\nAbstract text here.");
    }

    #[test]
    fn garbage_pdf_is_an_error() {
        assert!(pdf_text(b"definitely not a pdf").is_err());
    }
}
