use super::patterns::{
    extract_tips_remainder, is_ocr_artifact_line, looks_like_headerless_instruction,
    looks_like_ingredient_line,
};
use crate::normalize::{clean_text, strip_bullets};
use once_cell::sync::Lazy;
use regex::Regex;

static PAREN_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*[,;]\s*").unwrap());
static DOUBLED_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\(\s*([^()]*?)\s*\)\)").unwrap());
static PAREN_OPEN_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s+").unwrap());
static PAREN_CLOSE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\)").unwrap());
static INSTRUCTION_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:skillet|prepare|serve|sprinkle|immediately|return the|set aside|minutes?)\b")
        .unwrap()
});
static WORD_AND_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+\s+\d+$").unwrap());

const MAX_PASSES: usize = 8;

/// Repair publisher parenthesis noise: `((finely minced))`, `(, minced)`, unbalanced groups.
///
/// Unmatched closing parens are dropped and groups still open at the end of the line
/// are closed.
pub fn repair_parentheses(text: &str) -> String {
    let mut text = clean_text(text);
    if text.is_empty() {
        return text;
    }

    text = PAREN_COMMA.replace_all(&text, "(").into_owned();

    let mut previous = String::new();
    while text != previous {
        previous = text.clone();
        text = DOUBLED_GROUP.replace_all(&text, "($1)").into_owned();
        text = text.replace("((", "(").replace("))", ")");
    }

    text = PAREN_OPEN_SPACE.replace_all(&text, "(").into_owned();
    text = PAREN_CLOSE_SPACE.replace_all(&text, ")").into_owned();

    let mut depth = 0usize;
    let mut balanced = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '(' => {
                depth += 1;
                balanced.push(ch);
            }
            ')' if depth == 0 => {}
            ')' => {
                depth -= 1;
                balanced.push(ch);
            }
            _ => balanced.push(ch),
        }
    }
    balanced.extend(std::iter::repeat(')').take(depth));

    clean_text(&balanced)
}

fn sanitize_once(text: &str) -> String {
    let stripped = strip_bullets(&clean_text(text));
    repair_parentheses(&stripped)
}

/// Clean one ingredient line; `None` when nothing meaningful is left.
///
/// Runs to a fixed point, so sanitizing an already-sanitized line returns it unchanged.
pub fn sanitize_ingredient(text: &str) -> Option<String> {
    let mut current = sanitize_once(text);
    for _ in 0..MAX_PASSES {
        let next = sanitize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.chars().any(|c| c.is_alphanumeric()) {
        Some(current)
    } else {
        None
    }
}

/// Lines that reached the ingredient list but are instructions, page furniture or tips
pub fn should_drop_ingredient(text: &str) -> bool {
    let cleaned = clean_text(text);
    if cleaned.is_empty() || is_ocr_artifact_line(&cleaned) || extract_tips_remainder(&cleaned).is_some() {
        return true;
    }
    if looks_like_ingredient_line(&cleaned) {
        return false;
    }
    looks_like_headerless_instruction(&cleaned)
        || INSTRUCTION_VOCABULARY.is_match(&cleaned)
        || WORD_AND_NUMBER.is_match(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_parentheses() {
        assert_eq!(
            repair_parentheses("5 cloves garlic ((finely minced))"),
            "5 cloves garlic (finely minced)"
        );
        assert_eq!(repair_parentheses("1 onion (, diced)"), "1 onion (diced)");
        assert_eq!(repair_parentheses("2 cups stock) warm"), "2 cups stock warm");
        assert_eq!(
            repair_parentheses("1 cup cheese (such as cheddar"),
            "1 cup cheese (such as cheddar)"
        );
        assert_eq!(repair_parentheses("salt ( to taste )"), "salt (to taste)");
    }

    #[test]
    fn test_sanitize_ingredient_strips_markers_and_drops_empty() {
        assert_eq!(
            sanitize_ingredient("• - 1 cup sugar ((packed))"),
            Some("1 cup sugar (packed)".to_string())
        );
        assert_eq!(sanitize_ingredient("• ( )"), None);
        assert_eq!(sanitize_ingredient("   "), None);
    }

    #[test]
    fn test_should_drop_ingredient() {
        assert!(should_drop_ingredient("Preheat the oven to 350F"));
        assert!(should_drop_ingredient("Serve immediately"));
        assert!(should_drop_ingredient("Page 2"));
        assert!(should_drop_ingredient("Tips and variations"));
        assert!(!should_drop_ingredient("2 minutes rice"));
        assert!(!should_drop_ingredient("Fresh basil"));
        assert!(!should_drop_ingredient("Salt to taste"));
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "• 1 cup cheese (such as (aged cheddar",
            "2 tbsp butter ((softened)))",
            "((( salt",
            "- 1 lb beef (, cubed; trimmed)",
            "3 eggs",
        ];
        for sample in samples {
            let once = sanitize_ingredient(sample).unwrap();
            let twice = sanitize_ingredient(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }
}
