//! Content extraction functionality for the crawler module

use crate::crawler::error::CrawlError;
use crate::crawler::links::resolve_link;
use scraper::{Html, Selector};
use tracing::warn;
use url::Url;

/// Text and links pulled out of one HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Trimmed text of every content element, grouped by tag in scan order
    pub spans: Vec<String>,

    /// Absolute URLs of every `a[href]` on the page, in document order
    pub links: Vec<Url>,
}

/// Extract text spans and links from a page
///
/// # Arguments
///
/// * `html` - The HTML of the page
/// * `page_url` - The URL the page was fetched from, used to resolve links
/// * `content_tags` - Tag names to collect text from, scanned in order
///
/// # Returns
///
/// The spans and links of the page. The document is parsed here and not
/// returned, so callers never hold a parsed tree across an await point.
pub fn extract_page(
    html: &str,
    page_url: &Url,
    content_tags: &[String],
) -> Result<ExtractedPage, CrawlError> {
    let document = Html::parse_document(html);

    Ok(ExtractedPage {
        spans: extract_text_spans(&document, content_tags),
        links: extract_links(&document, page_url)?,
    })
}

/// Collect the trimmed text of each element matching `content_tags`.
///
/// Every element of the first tag is visited in document order, then every
/// element of the second tag, and so on. Nested elements each contribute their
/// own text, so a `div` wrapping a `p` yields both.
fn extract_text_spans(document: &Html, content_tags: &[String]) -> Vec<String> {
    let mut spans = Vec::new();

    for tag in content_tags {
        let selector = match Selector::parse(tag) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Failed to parse selector '{}': {}", tag, e);
                continue;
            }
        };

        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            spans.push(text.trim().to_string());
        }
    }

    spans
}

fn extract_links(document: &Html, page_url: &Url) -> Result<Vec<Url>, CrawlError> {
    let selector = Selector::parse("a[href]")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse link selector: {}", e)))?;

    Ok(document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::config::DEFAULT_CONTENT_TAGS;

    fn tags() -> Vec<String> {
        DEFAULT_CONTENT_TAGS.iter().map(|t| t.to_string()).collect()
    }

    fn page_url() -> Url {
        Url::parse("https://example.com/blog/").unwrap()
    }

    #[test]
    fn test_spans_follow_tag_order_then_document_order() {
        let html = r#"
            <html><body>
                <h1>Title</h1>
                <p>  First paragraph. </p>
                <h2>Subtitle</h2>
                <p>Second paragraph.</p>
            </body></html>
        "#;

        let page = extract_page(html, &page_url(), &tags()).unwrap();
        assert_eq!(
            page.spans,
            vec!["First paragraph.", "Second paragraph.", "Title", "Subtitle"]
        );
    }

    #[test]
    fn test_nested_elements_each_contribute() {
        let html = "<div><p>Inner</p> outer</div>";
        let page = extract_page(html, &page_url(), &tags()).unwrap();
        assert_eq!(page.spans, vec!["Inner", "Inner outer"]);
    }

    #[test]
    fn test_links_are_resolved_against_the_page() {
        let html = r#"
            <a href="post-1">One</a>
            <a href="/about">About</a>
            <a href="https://other.org/">Elsewhere</a>
            <a href="mailto:me@example.com">Mail</a>
            <a>No href</a>
        "#;

        let page = extract_page(html, &page_url(), &tags()).unwrap();
        let links: Vec<&str> = page.links.iter().map(Url::as_str).collect();
        assert_eq!(
            links,
            vec![
                "https://example.com/blog/post-1",
                "https://example.com/about",
                "https://other.org/",
            ]
        );
    }

    #[test]
    fn test_custom_tags_only() {
        let html = "<p>para</p><article>story</article>";
        let page = extract_page(html, &page_url(), &["article".to_string()]).unwrap();
        assert_eq!(page.spans, vec!["story"]);
    }

    #[test]
    fn test_empty_document() {
        let page = extract_page("", &page_url(), &tags()).unwrap();
        assert!(page.spans.is_empty());
        assert!(page.links.is_empty());
    }
}
