//! Line-shape heuristics shared by acquisition, classification and assembly.

use crate::duration::parse_duration_minutes;
use crate::normalize::clean_text;
use once_cell::sync::Lazy;
use regex::Regex;

pub const INGREDIENT_HEADERS: &[&str] = &[
    "ingredient",
    "ingredients",
    "for the ingredients",
    "what you'll need",
];

pub const STEP_HEADERS: &[&str] = &[
    "instruction",
    "instructions",
    "direction",
    "directions",
    "method",
    "preparation",
    "steps",
];

pub const NOTE_HEADERS: &[&str] = &[
    "note",
    "notes",
    "tip",
    "tips",
    "variation",
    "variations",
    "chef's note",
    "storage",
    "substitution",
    "substitutions",
];

/// Imperative verbs that open an instruction
pub const COOKING_VERBS: &[&str] = &[
    "add",
    "bake",
    "beat",
    "blend",
    "boil",
    "brown",
    "chop",
    "combine",
    "cook",
    "cool",
    "drain",
    "fold",
    "fry",
    "grill",
    "heat",
    "knead",
    "let",
    "marinate",
    "mash",
    "mix",
    "pat",
    "place",
    "pour",
    "preheat",
    "reduce",
    "refrigerate",
    "rest",
    "roast",
    "saute",
    "season",
    "serve",
    "simmer",
    "spread",
    "stir",
    "toast",
    "toss",
    "transfer",
    "whisk",
];

/// Measurement units (and common OCR misreads) that follow a leading quantity
pub const UNITS: &[&str] = &[
    "t", "tsp", "tsps", "teaspoon", "teaspoons", "teapoon", "teapoons", "tbsp", "tbsps",
    "tablespoon", "tablespoons", "c", "cup", "cups", "oz", "ounce", "ounces", "lb", "1b", "ib",
    "lbs", "pound", "pounds", "g", "gram", "grams", "kg", "kgs", "kilogram", "kilograms", "ml",
    "mls", "milliliter", "milliliters", "l", "liter", "liters", "pt", "pts", "pint", "pints",
    "qt", "qts", "quart", "quarts", "gal", "gals", "gallon", "gallons", "floz", "fl", "piece",
    "pieces", "pinch", "pinches", "dash", "dashes", "whole", "clove", "cloves", "bunch",
    "bunches", "can", "cans", "package", "packages", "stick", "sticks", "large", "medium",
    "small",
];

/// Section a header line switches the assembler into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Ingredients,
    Steps,
    Notes,
}

static EDGE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+|[\W_]+$").unwrap());
static NUMBER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2})\.\s+").unwrap());
static STEP_NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{1,2}\s*[.)]\s*").unwrap());
static STEP_BULLET_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[•·▪◦●]+\s*").unwrap());
static QUANTITY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d½¼¾⅓⅔⅛⅜⅝⅞/.\-]").unwrap());
static NUMBERED_MARKER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,2}[.)]\s").unwrap());
static ALNUM_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());
static TIME_LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:prep(?:ping)?|preparation|cook(?:ing)?|total)\s*tim(?:e)?\b").unwrap()
});
static TIME_LABEL_ANYWHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:prep(?:ping)?|preparation|cook(?:ing)?|total)\s*tim(?:e)?\b").unwrap()
});
static ONLY_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\W_]+$").unwrap());
static TIPS_REMAINDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btips?\s*(?:and|&)\s*variations?\b[:\-\s]*(.*)$").unwrap()
});
static TIPS_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^tips?(?:\s*(?:and|&)\s*variations?)?$").unwrap());
static NOTE_LEADING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[,;:\-•\s]+").unwrap());
static FIRST_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z]+)").unwrap());
static NOTE_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:flavor|nutrition|twist|optional|variation|tip|wine)\b").unwrap()
});
static STEP_VERB_ANYWHERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:add|cook|drain|heat|mix|preheat|prepare|remove|rest|return|serve|simmer|sprinkle|stir|toss)\b")
        .unwrap()
});
static STEP_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:bowl|broth|minutes?|oven|pot|sauce|set aside|skillet)\b").unwrap()
});
static TITLE_BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*[-•*]\s+").unwrap());
static TITLE_ADVICE_OPENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:for|feel|use)\b").unwrap());
static TITLE_ACTION_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:preheat|mix|add|bake|cook|stir|whisk|combine|toss|rest|serve|simmer|boil)\b")
        .unwrap()
});
static TITLE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z'&-]*").unwrap());
static YIELD_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\s*(?:-|–|to)\s*\d+)?)").unwrap());
static TOTAL_TIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:total\s*time|total|ready\s*in)\s*:?\s*(.+)$").unwrap()
});
static BARE_TIME_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*time\s*:\s*(.+)$").unwrap());
static PREP_TIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:prep\s*time|prepping\s*time|preparation\s*time)\s*:?\s*(.+)$").unwrap()
});
static COOK_TIME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:cook\s*time|cooking\s*time|bake\s*time|roast\s*time)\s*:?\s*(.+)$")
        .unwrap()
});
static FIRST_INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());
static CONTINUATION_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:and|or|then|plus|also)\b").unwrap());
static LOWERCASE_OPENER: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^[a-z(\[\"'/-]"#).unwrap());
static INGREDIENT_CONTINUATION_OPENER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:and|or|to|of|with|plus)\b").unwrap());

/// Lowercased header text without surrounding punctuation or a trailing colon
pub fn header_key(line: &str) -> String {
    let lowered = line.trim().to_lowercase();
    let stripped = EDGE_PUNCTUATION.replace_all(&lowered, "");
    stripped.trim_end_matches(':').trim().to_string()
}

/// Which section a well-known header line opens, if any
pub fn header_section(line: &str) -> Option<SectionKind> {
    let key = header_key(line);
    if INGREDIENT_HEADERS.contains(&key.as_str()) {
        Some(SectionKind::Ingredients)
    } else if STEP_HEADERS.contains(&key.as_str()) {
        Some(SectionKind::Steps)
    } else if NOTE_HEADERS.contains(&key.as_str()) {
        Some(SectionKind::Notes)
    } else {
        None
    }
}

/// Short `Something:` line naming a sub-section such as "For the dough:"
pub fn looks_like_subsection_header(line: &str) -> bool {
    let text = line.trim();
    let Some(stem) = text.strip_suffix(':') else {
        return false;
    };
    let words = stem.split_whitespace().count();
    (1..=7).contains(&words) && text.chars().count() <= 90 && !text.chars().any(|c| c.is_ascii_digit())
}

/// Split a collapsed numbered list (`"1. Mix. 2. Bake."`) into one entry per number.
///
/// Splitting only happens when at least two markers are found and the first one opens
/// the text. Sentence boundaries are never used as split points.
pub fn split_numbered_steps(text: &str) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let starts: Vec<usize> = NUMBER_MARKER
        .find_iter(&cleaned)
        .map(|m| m.start())
        .filter(|&start| {
            !cleaned[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .collect();

    if starts.len() < 2 || starts[0] != 0 {
        return vec![cleaned];
    }

    let parts: Vec<String> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(cleaned.len());
            clean_text(&cleaned[start..end])
        })
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        vec![cleaned]
    } else {
        parts
    }
}

/// Drop bullets and a leading `N.`/`N)` marker; step numbering is positional
pub fn strip_step_number(text: &str) -> String {
    let cleaned = clean_text(text);
    let cleaned = STEP_BULLET_PREFIX.replace(&cleaned, "");
    let cleaned = STEP_NUMBER_PREFIX.replace(cleaned.trim(), "");
    STEP_BULLET_PREFIX.replace(cleaned.trim(), "").trim().to_string()
}

/// Text opens with an explicit `N.` or `N)` step marker
pub fn has_step_number(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with(|c: char| c.is_ascii_digit()) && STEP_NUMBER_PREFIX.is_match(trimmed)
}

/// Quantity-led line such as `2 cups flour` or `½ tsp salt`
pub fn looks_like_ingredient_line(line: &str) -> bool {
    let text = line.trim();
    QUANTITY_PREFIX.is_match(text) && !NUMBERED_MARKER_PREFIX.is_match(text)
}

/// Quantity followed by a known unit, e.g. `1 1/2 cups sugar`
pub fn has_quantity_and_unit(line: &str) -> bool {
    let lowered = line.trim().to_lowercase();
    if !QUANTITY_PREFIX.is_match(&lowered) {
        return false;
    }
    lowered
        .split(|c: char| c.is_whitespace() || c == '.')
        .filter(|token| !token.is_empty())
        .skip_while(|token| {
            token
                .chars()
                .all(|c| c.is_ascii_digit() || "½¼¾⅓⅔⅛⅜⅝⅞/-".contains(c))
        })
        .take(1)
        .any(|token| UNITS.contains(&token))
}

fn alnum_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    ALNUM_TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Instruction written without a section header (`Preheat the oven...`, `Then whisk...`)
pub fn looks_like_headerless_instruction(line: &str) -> bool {
    let text = line.trim();
    if text.is_empty() || looks_like_ingredient_line(text) {
        return false;
    }
    if split_numbered_steps(text).len() > 1 {
        return true;
    }

    let tokens = alnum_tokens(text);
    let Some(first) = tokens.first() else {
        return false;
    };
    if starts_with_cooking_verb(first) {
        return true;
    }
    matches!(first.as_str(), "in" | "on" | "to" | "then" | "meanwhile")
        && tokens.iter().any(|token| COOKING_VERBS.contains(&token.as_str()))
}

fn starts_with_cooking_verb(first_token: &str) -> bool {
    COOKING_VERBS.contains(&first_token)
}

/// Watermarks, footers, bare punctuation and other recognition debris
pub fn is_ocr_artifact_line(text: &str) -> bool {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return true;
    }
    let lowered = cleaned.to_lowercase();
    if lowered.contains("templatelab") || lowered.contains("created by") || lowered == "reated b" {
        return true;
    }
    if TIME_LABEL_PREFIX.is_match(&lowered) {
        return true;
    }
    if ONLY_PUNCTUATION.is_match(&cleaned) {
        return true;
    }
    cleaned.chars().filter(|c| c.is_ascii_alphabetic()).count() <= 1
}

/// Text after a "Tips and variations" marker; `Some("")` for a bare marker line
pub fn extract_tips_remainder(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return None;
    }
    match TIPS_REMAINDER.captures(&cleaned) {
        Some(caps) => Some(clean_text(caps.get(1).map_or("", |m| m.as_str()))),
        None if TIPS_ONLY.is_match(&cleaned) => Some(String::new()),
        None => None,
    }
}

pub fn normalize_note_text(text: &str) -> String {
    let cleaned = clean_text(text);
    clean_text(&NOTE_LEADING_PUNCTUATION.replace(&cleaned, ""))
}

/// Commentary that belongs in notes even when labeled otherwise
pub fn looks_like_note_fragment(text: &str) -> bool {
    let cleaned = clean_text(text);
    if cleaned.is_empty()
        || looks_like_ingredient_line(&cleaned)
        || looks_like_headerless_instruction(&cleaned)
    {
        return false;
    }

    if cleaned.starts_with([',', ';', ':']) {
        return cleaned.split_whitespace().count() >= 2;
    }

    let first = FIRST_WORD
        .captures(&cleaned)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_default();
    if matches!(
        first.as_str(),
        "for" | "feel" | "use" | "optional" | "tip" | "tips" | "variation" | "variations" | "extra"
    ) {
        return true;
    }

    NOTE_VOCABULARY.is_match(&cleaned.to_lowercase())
}

/// Instruction prose that drifted into a notes block
pub fn looks_like_step_fragment(text: &str) -> bool {
    let cleaned = clean_text(text);
    if cleaned.is_empty()
        || is_ocr_artifact_line(&cleaned)
        || extract_tips_remainder(&cleaned).is_some()
        || looks_like_ingredient_line(&cleaned)
        || looks_like_note_fragment(&cleaned)
    {
        return false;
    }
    if looks_like_headerless_instruction(&cleaned) {
        return true;
    }

    let lowered = cleaned.to_lowercase();
    STEP_VERB_ANYWHERE.is_match(&lowered)
        || STEP_VOCABULARY.is_match(&lowered)
        || (cleaned.ends_with('.') && cleaned.split_whitespace().count() >= 4)
}

/// Number of title-like words (letters, apostrophes, ampersands, hyphens)
pub fn title_word_count(text: &str) -> usize {
    TITLE_WORD.find_iter(text).count()
}

/// Plausible recipe name: short, no trailing period, not a header, metadata or action line
pub fn looks_like_recipe_title(text: &str) -> bool {
    let cleaned = clean_text(text);
    if cleaned.is_empty()
        || extract_tips_remainder(&cleaned).is_some()
        || looks_like_ingredient_line(&cleaned)
        || extract_metadata_line(&cleaned).is_some()
        || TIME_LABEL_ANYWHERE.is_match(&cleaned)
        || header_section(&cleaned).is_some()
        || TITLE_BULLET.is_match(&cleaned)
        || cleaned.ends_with('.')
        || cleaned.ends_with(':')
        || TITLE_ADVICE_OPENER.is_match(&cleaned)
        || TITLE_ACTION_OPENER.is_match(&cleaned)
    {
        return false;
    }
    if cleaned.contains(',') && cleaned.split_whitespace().count() > 8 {
        return false;
    }
    (1..=16).contains(&title_word_count(&cleaned))
}

/// Yield, total, prep and cook values recognized on a single line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataLine {
    pub yields: Option<String>,
    pub total_minutes: Option<u32>,
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
}

fn extract_yield_line(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    let prefixes = [
        "serves", "serving", "servings", "yield", "yields", "makes", "portion", "portions",
    ];
    let matches_prefix = prefixes.iter().any(|key| {
        lowered == *key || lowered.starts_with(&format!("{key} ")) || lowered.starts_with(&format!("{key}:"))
    });
    if !matches_prefix {
        return None;
    }

    let caps = YIELD_NUMBER.captures(text)?;
    let number = caps[1].replace(" to ", "-").replace('–', "-");
    let number = number.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(format!("{number} servings"))
}

fn minutes_after(pattern: &Regex, text: &str) -> Option<u32> {
    let caps = pattern.captures(text)?;
    let tail = clean_text(&caps[1]);
    if tail.is_empty() {
        return None;
    }
    parse_duration_minutes(&tail).or_else(|| {
        FIRST_INTEGER
            .captures(&tail)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .filter(|minutes| *minutes > 0)
    })
}

/// Recognize serving-count and time lines (`Serves 4`, `Prep time: 15 min`)
pub fn extract_metadata_line(text: &str) -> Option<MetadataLine> {
    if text.trim().is_empty() {
        return None;
    }

    let metadata = MetadataLine {
        yields: extract_yield_line(text),
        total_minutes: minutes_after(&TOTAL_TIME_LINE, text)
            .or_else(|| minutes_after(&BARE_TIME_LINE, text)),
        prep_minutes: minutes_after(&PREP_TIME_LINE, text),
        cook_minutes: minutes_after(&COOK_TIME_LINE, text),
    };

    if metadata == MetadataLine::default() {
        None
    } else {
        Some(metadata)
    }
}

/// `current` continues a step that wrapped onto a new line
pub fn looks_like_step_continuation(previous: &str, current: &str) -> bool {
    let prev = clean_text(previous);
    let curr = clean_text(current);
    if prev.is_empty() || curr.is_empty() {
        return false;
    }
    if STEP_NUMBER_PREFIX.is_match(&curr) && curr.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    if looks_like_subsection_header(&curr) {
        return false;
    }
    if prev.ends_with(['.', '!', '?']) {
        return false;
    }
    if prev.ends_with([',', ';', '-', '–', '—', '/']) {
        return true;
    }
    if prev.matches('(').count() > prev.matches(')').count() {
        return true;
    }
    CONTINUATION_OPENER.is_match(&curr) || LOWERCASE_OPENER.is_match(&curr)
}

/// `current` continues an ingredient that wrapped onto a new line
pub fn looks_like_ingredient_continuation(previous: &str, current: &str) -> bool {
    let prev = clean_text(previous);
    let curr = clean_text(current);
    if prev.is_empty() || curr.is_empty() || looks_like_ingredient_line(&curr) {
        return false;
    }
    if prev.ends_with([',', ';', '-', '(', '/']) {
        return true;
    }
    if prev.matches('(').count() > prev.matches(')').count() {
        return true;
    }
    INGREDIENT_CONTINUATION_OPENER.is_match(&curr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_numbered_steps_requires_leading_marker() {
        let collapsed = "1. Preheat oven to 350. 2. Cream the butter. 3. Fold in chips. 4. Bake 12 minutes.";
        let steps = split_numbered_steps(collapsed);
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], "1. Preheat oven to 350.");
        assert_eq!(steps[3], "4. Bake 12 minutes.");

        let prose = "Mix well. Bake until golden. Let cool. Serve warm.";
        assert_eq!(split_numbered_steps(prose), vec![prose.to_string()]);

        let late_marker = "Do this first 1. then 2. then more";
        assert_eq!(split_numbered_steps(late_marker).len(), 1);

        let single = "1. Only one step here.";
        assert_eq!(split_numbered_steps(single).len(), 1);
    }

    #[test]
    fn test_strip_step_number() {
        assert_eq!(strip_step_number("1. Preheat the oven."), "Preheat the oven.");
        assert_eq!(strip_step_number("• 2) Stir."), "Stir.");
        assert_eq!(strip_step_number("Stir well."), "Stir well.");
    }

    #[test]
    fn test_header_section() {
        assert_eq!(header_section("Ingredients:"), Some(SectionKind::Ingredients));
        assert_eq!(header_section("DIRECTIONS"), Some(SectionKind::Steps));
        assert_eq!(header_section("Chef's Note"), Some(SectionKind::Notes));
        assert_eq!(header_section("For the dough:"), None);
        assert!(looks_like_subsection_header("For the dough:"));
        assert!(!looks_like_subsection_header("Bake at 350:"));
    }

    #[test]
    fn test_line_shapes() {
        assert!(looks_like_ingredient_line("2 cups flour"));
        assert!(looks_like_ingredient_line("½ tsp salt"));
        assert!(!looks_like_ingredient_line("1. Preheat the oven"));
        assert!(has_quantity_and_unit("1 1/2 cups sugar"));
        assert!(!has_quantity_and_unit("2 eggs"));
        assert!(looks_like_headerless_instruction("Preheat the oven to 400F."));
        assert!(looks_like_headerless_instruction("Meanwhile, whisk the eggs."));
        assert!(!looks_like_headerless_instruction("Fresh basil"));
    }

    #[test]
    fn test_artifacts_and_tips() {
        assert!(is_ocr_artifact_line("Created by TemplateLab"));
        assert!(is_ocr_artifact_line("— • —"));
        assert!(is_ocr_artifact_line("x"));
        assert!(!is_ocr_artifact_line("Salt"));
        assert_eq!(
            extract_tips_remainder("Tips & Variations: add chili flakes"),
            Some("add chili flakes".to_string())
        );
        assert_eq!(extract_tips_remainder("Tips"), Some(String::new()));
        assert_eq!(extract_tips_remainder("Stir in tips of asparagus"), None);
    }

    #[test]
    fn test_recipe_title() {
        assert!(looks_like_recipe_title("Chewy Chocolate Chip Cookies"));
        assert!(looks_like_recipe_title("Pancakes"));
        assert!(!looks_like_recipe_title("Preheat the oven"));
        assert!(!looks_like_recipe_title("Serves 4"));
        assert!(!looks_like_recipe_title("Ingredients"));
        assert!(!looks_like_recipe_title("Mix until smooth."));
    }

    #[test]
    fn test_metadata_lines() {
        let serves = extract_metadata_line("Serves 4 to 6").unwrap();
        assert_eq!(serves.yields.as_deref(), Some("4-6 servings"));

        let total = extract_metadata_line("Total time: 1 hour 15 minutes").unwrap();
        assert_eq!(total.total_minutes, Some(75));

        let prep = extract_metadata_line("Prep Time: 15 mins").unwrap();
        assert_eq!(prep.prep_minutes, Some(15));

        let ready = extract_metadata_line("Ready in about 30").unwrap();
        assert_eq!(ready.total_minutes, Some(30));

        assert!(extract_metadata_line("2 cups flour").is_none());
        assert!(extract_metadata_line("Makes the best cookies").is_none());
    }

    #[test]
    fn test_continuations() {
        assert!(looks_like_step_continuation("Stir in the flour,", "then fold gently."));
        assert!(!looks_like_step_continuation("Stir in the flour.", "then fold gently."));
        assert!(!looks_like_step_continuation("Stir in the flour", "2. Bake."));
        assert!(looks_like_ingredient_continuation("1 cup cheese (such as", "cheddar)"));
        assert!(looks_like_ingredient_continuation("Salt", "to taste"));
        assert!(!looks_like_ingredient_continuation("1 cup flour", "2 eggs"));
    }
}
