//! Source acquisition: turn fetched markup into ordered raw lines plus metadata.
//!
//! Strategies are tried in a fixed order and the first one that yields lines wins.

use crate::error::ExtractError;
use crate::model::SourceMetadata;
use log::{debug, info};
use reqwest::Url;
use scraper::Html;

pub mod fetcher;
pub mod json_ld;
pub mod json_repair;
pub mod microdata;
pub mod visible_text;

pub use fetcher::RequestFetcher;
pub use json_ld::JsonLdStrategy;
pub use microdata::MicroDataStrategy;
pub use visible_text::VisibleTextStrategy;

/// Parsed document handed to every strategy
pub struct ParsingContext {
    pub source_url: Option<String>,
    pub document: Html,
}

impl ParsingContext {
    pub fn new(html: &str, source_url: Option<&str>) -> Self {
        Self {
            source_url: source_url.map(str::to_string),
            document: Html::parse_document(html),
        }
    }
}

/// Raw lines (not yet normalized) and the metadata found next to them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquiredSource {
    pub lines: Vec<String>,
    pub metadata: SourceMetadata,
}

impl AcquiredSource {
    pub fn new(lines: Vec<String>, metadata: SourceMetadata) -> Self {
        Self { lines, metadata }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.trim().is_empty())
    }
}

pub trait SourceStrategy {
    fn name(&self) -> &'static str;

    /// `None` means this strategy found nothing usable; the next one is tried
    fn acquire(&self, context: &ParsingContext) -> Option<AcquiredSource>;
}

/// Structured data first, then microdata, then visible text
pub fn default_strategies() -> Vec<Box<dyn SourceStrategy>> {
    vec![
        Box::new(JsonLdStrategy),
        Box::new(MicroDataStrategy),
        Box::new(VisibleTextStrategy),
    ]
}

/// Run the strategy chain over an HTML document
pub fn acquire_html(html: &str, source_url: Option<&str>) -> Result<AcquiredSource, ExtractError> {
    let context = ParsingContext::new(html, source_url);
    acquire_with(&default_strategies(), &context)
}

pub fn acquire_with(
    strategies: &[Box<dyn SourceStrategy>],
    context: &ParsingContext,
) -> Result<AcquiredSource, ExtractError> {
    for strategy in strategies {
        debug!("Attempting acquisition with {} strategy", strategy.name());
        match strategy.acquire(context) {
            Some(acquired) if !acquired.is_empty() => {
                info!(
                    "Acquired {} lines with {} strategy",
                    acquired.lines.len(),
                    strategy.name()
                );
                return Ok(acquired);
            }
            _ => debug!("{} strategy found nothing", strategy.name()),
        }
    }

    Err(ExtractError::NoExtractableContent)
}

/// Host part of a URL, used as the default source attribution
pub fn source_title_from_url(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
}

/// Absolute `http(s)` form of an image reference.
///
/// Scheme-relative (`//cdn/x.jpg`) and root-relative (`/x.jpg`) references are resolved
/// against `base` when one is known.
pub fn resolve_image_url(raw: &str, base: Option<&str>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let is_web = |url: &Url| matches!(url.scheme(), "http" | "https");

    if let Ok(url) = Url::parse(raw) {
        return is_web(&url).then(|| url.to_string());
    }

    if !raw.starts_with('/') {
        return None;
    }

    let resolved = match base.and_then(|base| Url::parse(base).ok()) {
        Some(base) => base.join(raw).ok()?,
        None if raw.starts_with("//") => Url::parse(&format!("https:{raw}")).ok()?,
        None => return None,
    };
    is_web(&resolved).then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_image_url() {
        assert_eq!(
            resolve_image_url("https://cdn.example.com/a.jpg", None).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(
            resolve_image_url("//cdn.example.com/a.jpg", Some("https://example.com/recipe")).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert_eq!(
            resolve_image_url("/img/a.jpg", Some("https://example.com/recipes/soup")).as_deref(),
            Some("https://example.com/img/a.jpg")
        );
        assert_eq!(resolve_image_url("/img/a.jpg", None), None);
        assert_eq!(resolve_image_url("data:image/png;base64,AAAA", None), None);
        assert_eq!(resolve_image_url("img/a.jpg", Some("https://example.com/")), None);
    }

    #[test]
    fn test_source_title_from_url() {
        assert_eq!(
            source_title_from_url("https://www.example.com/recipes/1").as_deref(),
            Some("www.example.com")
        );
        assert_eq!(source_title_from_url("not a url"), None);
    }

    #[test]
    fn test_strategy_chain_falls_through_to_visible_text() {
        let html = r#"<html><head><title>Plain Soup</title></head>
            <body><main><p>2 cups broth</p><p>Heat the broth. Serve hot.</p></main></body></html>"#;
        let acquired = acquire_html(html, None).unwrap();
        assert_eq!(acquired.metadata.method.as_deref(), Some("visible_text"));
        assert_eq!(acquired.lines[0], "Plain Soup");
    }

    #[test]
    fn test_empty_document_is_no_content() {
        let result = acquire_html("<html><body><script>var x = 1;</script></body></html>", None);
        assert!(matches!(result, Err(ExtractError::NoExtractableContent)));
    }
}
