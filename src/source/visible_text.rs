use super::{source_title_from_url, AcquiredSource, ParsingContext, SourceStrategy};
use crate::model::SourceMetadata;
use crate::normalize::{collapse_whitespace, decode_entities};
use log::debug;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Node, Selector};

static OG_TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[property='og:title']").unwrap());
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static MAIN_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("article, main").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Last resort: the rendered text of the main content region, one block per line
pub struct VisibleTextStrategy;

impl SourceStrategy for VisibleTextStrategy {
    fn name(&self) -> &'static str {
        "visible_text"
    }

    fn acquire(&self, context: &ParsingContext) -> Option<AcquiredSource> {
        let document = &context.document;

        // Largest <article>/<main> by markup size, else the whole document
        let root = document
            .select(&MAIN_SELECTOR)
            .max_by_key(|element| element.html().len())
            .unwrap_or_else(|| document.root_element());

        let mut raw = String::new();
        collect_visible_text(root, &mut raw);

        let mut lines: Vec<String> = raw
            .lines()
            .map(collapse_whitespace)
            .filter(|line| !line.is_empty())
            .flat_map(|line| split_sentences(&line))
            .collect();

        if lines.is_empty() {
            debug!("Visible text: no text outside scripts and hidden elements");
            return None;
        }

        let title = page_title(context);
        if let Some(title) = &title {
            lines.insert(0, title.clone());
        }

        let source_url = context.source_url.clone();
        let metadata = SourceMetadata {
            title,
            source_title: source_url.as_deref().and_then(source_title_from_url),
            source_url,
            method: Some(self.name().to_string()),
            ..Default::default()
        };

        Some(AcquiredSource::new(lines, metadata))
    }
}

/// `og:title`, then the first `<h1>`, then `<title>`
fn page_title(context: &ParsingContext) -> Option<String> {
    let document = &context.document;
    let og_title = document
        .select(&OG_TITLE_SELECTOR)
        .filter_map(|meta| meta.value().attr("content"))
        .map(|content| collapse_whitespace(&decode_entities(content)))
        .find(|title| !title.is_empty());

    og_title.or_else(|| {
        [&*H1_SELECTOR, &*TITLE_SELECTOR]
            .into_iter()
            .filter_map(|selector| document.select(selector).next())
            .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
            .find(|title| !title.is_empty())
    })
}

fn is_hidden(element: &ElementRef) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

fn collect_visible_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_hidden(&child_element) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                collect_visible_text(child_element, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Break prose at sentence ends so each instruction sentence gets its own line
fn split_sentences(line: &str) -> Vec<String> {
    line.replace(". ", ".\n")
        .lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acquire(html: &str) -> Option<AcquiredSource> {
        VisibleTextStrategy.acquire(&ParsingContext::new(html, None))
    }

    #[test]
    fn test_prefers_largest_main_region_and_skips_hidden() {
        let html = r#"<html><head>
            <meta property="og:title" content="Lemon Bars &amp; Glaze">
            <title>Lemon Bars | Blog</title></head>
            <body>
              <nav>Home Recipes About</nav>
              <article><p>Short teaser</p></article>
              <main>
                <h2>Ingredients</h2>
                <ul><li>1 cup flour</li><li>2 lemons</li></ul>
                <div style="display: none">Subscribe now</div>
                <div hidden>Popup</div>
                <span aria-hidden="true">*</span>
                <script>trackPageview()</script>
                <h2>Instructions</h2>
                <p>Mix the flour. Bake for 20 minutes.</p>
              </main>
            </body></html>"#;

        let acquired = acquire(html).unwrap();
        assert_eq!(
            acquired.lines,
            vec![
                "Lemon Bars & Glaze",
                "Ingredients",
                "1 cup flour",
                "2 lemons",
                "Instructions",
                "Mix the flour.",
                "Bake for 20 minutes.",
            ]
        );
        assert_eq!(acquired.metadata.title.as_deref(), Some("Lemon Bars & Glaze"));
    }

    #[test]
    fn test_title_falls_back_to_h1() {
        let html = "<html><head><title>Site | Soup</title></head><body><h1>Pea Soup</h1><p>Boil peas.</p></body></html>";
        let acquired = acquire(html).unwrap();
        assert_eq!(acquired.lines[0], "Pea Soup");
    }

    #[test]
    fn test_only_scripts_yields_nothing() {
        let html = "<html><body><script>var a = 1;</script><style>p{}</style></body></html>";
        assert!(acquire(html).is_none());
    }
}
