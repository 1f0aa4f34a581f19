//! Deterministic labels for lines whose shape leaves no doubt.

use super::features::normalize_for_features;
use crate::model::Label;
use once_cell::sync::Lazy;
use regex::Regex;

pub const ACTION_PREFIXES: &[&str] = &[
    "add", "bake", "beat", "boil", "brown", "chop", "combine", "cook", "fold", "heat", "let",
    "marinate", "mash", "mix", "pat", "pour", "preheat", "refrigerate", "rest", "roast", "saute",
    "serve", "simmer", "spread", "stir", "toast", "toss", "whisk",
];

pub const NOTE_PREFIXES: &[&str] = &[
    "note",
    "notes",
    "tip",
    "tips",
    "chef's note",
    "variation",
    "variations",
    "storage",
];

pub const HEADER_KEYWORDS: &[&str] = &[
    "ingredients",
    "ingredient",
    "instructions",
    "instruction",
    "directions",
    "direction",
    "steps",
    "step",
    "method",
];

const INGREDIENT_HEADER_KEYWORDS: &[&str] = &[
    "ingredient",
    "ingredients",
    "for the ingredients",
    "what you'll need",
];

const STEP_HEADER_KEYWORDS: &[&str] = &[
    "instruction",
    "instructions",
    "direction",
    "directions",
    "step",
    "steps",
    "method",
    "preparation",
];

const INGREDIENT_HINTS: &[&str] = &["to taste", "for garnish", "optional", "divided", "melted"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static QUANTITY_LED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d½¼¾⅓⅔⅛⅜⅝⅞/.\-]+\s+").unwrap());
static MULTIPLIER_LED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*[x×]\s+").unwrap());

/// Section a header line opens, as seen by the classifier's context rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSection {
    Ingredients,
    Steps,
    Notes,
}

fn compact(text: &str) -> String {
    WHITESPACE
        .replace_all(&normalize_for_features(text), " ")
        .trim()
        .to_string()
}

pub fn starts_with_action(compact: &str) -> bool {
    ACTION_PREFIXES
        .iter()
        .any(|prefix| compact.starts_with(&format!("{prefix} ")))
}

/// Every cased run starts uppercase and continues lowercase
fn is_title_cased(text: &str) -> bool {
    let mut previous_cased = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            let expected_upper = !previous_cased;
            if (expected_upper && c.is_lowercase()) || (!expected_upper && c.is_uppercase()) {
                return false;
            }
            previous_cased = true;
        } else {
            previous_cased = false;
        }
    }
    true
}

/// Label and confidence for lines a fixed rule recognizes, `None` otherwise
pub fn rule_based_label(text: &str) -> Option<(Label, f64)> {
    let raw = text.trim();
    let compact = compact(text);
    if compact.is_empty() {
        return Some((Label::Junk, 0.99));
    }

    let words: Vec<&str> = compact.split_whitespace().collect();

    if compact.starts_with('<') && compact.ends_with('>') {
        return Some((Label::Junk, 0.99));
    }
    if HEADER_KEYWORDS.contains(&compact.as_str()) {
        return Some((Label::Header, 0.99));
    }
    if compact.starts_with("for the ") && compact.ends_with(':') {
        return Some((Label::Header, 0.97));
    }
    if let Some(stem) = compact.strip_suffix(':') {
        let stem = stem.trim();
        if NOTE_PREFIXES.iter().any(|prefix| stem.starts_with(prefix))
            || HEADER_KEYWORDS.contains(&stem)
        {
            return Some((Label::Header, 0.98));
        }
        if words.len() <= 5 {
            return Some((Label::Header, 0.90));
        }
    }
    if NOTE_PREFIXES
        .iter()
        .any(|prefix| compact.starts_with(&format!("{prefix}:")))
    {
        return Some((Label::Note, 0.97));
    }
    if NOTE_PREFIXES
        .iter()
        .any(|prefix| compact.starts_with(&format!("{prefix} ")))
    {
        return Some((Label::Note, 0.95));
    }
    if QUANTITY_LED.is_match(&compact) {
        return Some((Label::Ingredient, 0.95));
    }
    if MULTIPLIER_LED.is_match(&compact) {
        return Some((Label::Ingredient, 0.92));
    }
    if starts_with_action(&compact) {
        return Some((Label::Step, 0.92));
    }
    if words.len() >= 8 {
        return Some((Label::Step, 0.88));
    }
    if INGREDIENT_HINTS.iter().any(|hint| compact.contains(hint)) {
        return Some((Label::Ingredient, 0.86));
    }

    let looks_like_title = (2..=6).contains(&words.len())
        && !raw.contains(':')
        && !raw.chars().any(|c| c.is_ascii_digit())
        && raw.chars().next().is_some_and(char::is_uppercase)
        && is_title_cased(raw);
    if looks_like_title {
        return Some((Label::Title, 0.78));
    }

    None
}

/// `Notes:`, `Tip`, `Storage` and the like
pub fn looks_like_note_header(text: &str) -> bool {
    let normalized = normalize_for_features(text);
    let normalized = normalized.trim();
    let stem = normalized.strip_suffix(':').unwrap_or(normalized).trim();
    !stem.is_empty() && NOTE_PREFIXES.iter().any(|prefix| stem.starts_with(prefix))
}

pub fn header_section_from_text(text: &str) -> Option<HeaderSection> {
    let normalized = normalize_for_features(text);
    let normalized = normalized.trim();
    let stem = normalized.strip_suffix(':').unwrap_or(normalized).trim();
    if INGREDIENT_HEADER_KEYWORDS.contains(&stem) {
        Some(HeaderSection::Ingredients)
    } else if STEP_HEADER_KEYWORDS.contains(&stem) {
        Some(HeaderSection::Steps)
    } else if !stem.is_empty() && NOTE_PREFIXES.iter().any(|prefix| stem.starts_with(prefix)) {
        Some(HeaderSection::Notes)
    } else {
        None
    }
}
