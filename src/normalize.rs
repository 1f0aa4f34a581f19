//! Line normalization shared by every acquisition path.
//!
//! Raw text from any source is decoded, stripped of markup and list bullets,
//! whitespace-collapsed and deduplicated before it reaches the classifier.

use crate::model::Line;
use html_escape::decode_html_entities;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());
static BULLET_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[•●○◦▪▫·*‣⁃]+|[-–—]+\s)\s*").unwrap());

/// Decode HTML entities (named, decimal and hex references).
///
/// Publishers frequently double-encode (`&amp;frac12;`), so decoding runs twice.
pub fn decode_entities(text: &str) -> String {
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

/// Collapse runs of whitespace (including non-breaking space) into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE
        .replace_all(&text.replace('\u{a0}', " "), " ")
        .trim()
        .to_string()
}

/// Entity-decode and whitespace-collapse a text fragment
pub fn clean_text(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

/// Replace every markup tag with a space
pub fn strip_tags(text: &str) -> String {
    TAG.replace_all(text, " ").into_owned()
}

/// Remove leading bullet markers (`•`, `*`, `- `, ...) until none remain.
///
/// Numbered markers (`1.`) are left alone; collapsed numbered instructions rely on them.
pub fn strip_bullets(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let stripped = BULLET_PREFIX.replace(&current, "").trim().to_string();
        if stripped == current {
            return current;
        }
        current = stripped;
    }
}

/// Comparison key used to spot near-identical lines
pub fn dedupe_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalize one raw line; `None` when nothing meaningful remains
pub fn normalize_line(raw: &str) -> Option<String> {
    let text = collapse_whitespace(&strip_tags(&decode_entities(raw)));
    let text = strip_bullets(&text);
    if text.is_empty() || dedupe_key(&text).is_empty() {
        return None;
    }
    Some(text)
}

/// Split raw text into normalized lines, dropping adjacent near-duplicates
pub fn normalize_lines<S: AsRef<str>>(raw_lines: &[S], max_lines: usize) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut previous_key = String::new();

    for raw in raw_lines {
        for piece in raw.as_ref().lines() {
            let Some(text) = normalize_line(piece) else {
                continue;
            };
            let key = dedupe_key(&text);
            if key == previous_key {
                debug!("Normalizer: dropping adjacent duplicate '{}'", text);
                continue;
            }
            previous_key = key;
            lines.push(Line::new(text));
        }
    }

    if lines.len() > max_lines {
        debug!(
            "Normalizer: truncating {} lines to {}",
            lines.len(),
            max_lines
        );
        lines.truncate(max_lines);
    }
    lines
}

/// Normalize a whole text blob
pub fn normalize_text(text: &str, max_lines: usize) -> Vec<Line> {
    normalize_lines(&[text], max_lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Salt &amp; pepper"), "Salt & pepper");
        assert_eq!(decode_entities("&#189; cup"), "½ cup");
        assert_eq!(decode_entities("&#xBD; cup"), "½ cup");
        assert_eq!(decode_entities("&frac12; cup"), "½ cup");
        assert_eq!(decode_entities("&ldquo;best&rdquo;"), "“best”");
        assert_eq!(decode_entities("it&#39;s &apos;ok&apos;"), "it's 'ok'");
        assert_eq!(decode_entities("&lt;b&gt; &quot;x&quot;"), "<b> \"x\"");
        assert_eq!(decode_entities("&amp;frac14; tsp"), "¼ tsp");
    }

    #[test]
    fn test_normalize_line_strips_markup_and_bullets() {
        assert_eq!(
            normalize_line("  • <b>2 cups</b>&nbsp;flour  "),
            Some("2 cups flour".to_string())
        );
        assert_eq!(normalize_line("- - 1 egg"), Some("1 egg".to_string()));
        assert_eq!(
            normalize_line("1. Preheat the oven."),
            Some("1. Preheat the oven.".to_string())
        );
        assert_eq!(normalize_line("-5 degrees"), Some("-5 degrees".to_string()));
        assert_eq!(normalize_line("   "), None);
        assert_eq!(normalize_line("* * *"), None);
    }

    #[test]
    fn test_normalize_lines_dedupes_adjacent_only() {
        let text = "Pancakes\npancakes!\n\n2 eggs\nMix.\n2 eggs";
        let lines = normalize_text(text, 400);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Pancakes", "2 eggs", "Mix.", "2 eggs"]);
    }

    #[test]
    fn test_normalize_lines_truncates() {
        let text = (0..10).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        assert_eq!(normalize_text(&text, 3).len(), 3);
    }

    #[test]
    fn test_less_than_sign_is_not_a_tag() {
        assert_eq!(
            normalize_line("bake < 10 minutes"),
            Some("bake < 10 minutes".to_string())
        );
    }
}
