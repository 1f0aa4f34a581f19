use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static NUMBER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.):-]\s*").unwrap());
static BULLET_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[•●○◦▪▫\-]+\s*").unwrap());
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub const MIN_CHAR_NGRAM: usize = 3;

/// Sparse feature bag, ordered so serialized previews are stable
pub type FeatureCounts = BTreeMap<String, u32>;

/// Lowercased text without a leading `N.`/`N)` marker or bullet
pub fn normalize_for_features(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let without_number = NUMBER_MARKER.replace(&lowered, "");
    BULLET_MARKER.replace(&without_number, "").into_owned()
}

/// Word unigrams and bigrams, character n-grams and a few shape hints
pub fn extract_features(text: &str, max_char_ngram: usize) -> FeatureCounts {
    let normalized = normalize_for_features(text);
    let tokens: Vec<&str> = TOKEN.find_iter(&normalized).map(|m| m.as_str()).collect();

    let mut features = FeatureCounts::new();
    let mut bump = |key: String| *features.entry(key).or_insert(0) += 1;

    for token in &tokens {
        bump(format!("tok:{token}"));
    }
    for pair in tokens.windows(2) {
        bump(format!("tok2:{}_{}", pair[0], pair[1]));
    }

    let compact: Vec<char> = WHITESPACE.replace_all(&normalized, " ").chars().collect();
    for n in MIN_CHAR_NGRAM..=max_char_ngram {
        if compact.len() < n {
            continue;
        }
        for gram in compact.windows(n) {
            let gram: String = gram.iter().collect();
            bump(format!("chr{n}:{gram}"));
        }
    }

    if normalized.ends_with(':') {
        bump("shape:ends_colon".to_string());
    }
    if normalized.chars().any(|c| c.is_ascii_digit()) {
        bump("shape:has_digit".to_string());
    }
    if normalized.starts_with("note") || normalized.starts_with("tip") {
        bump("shape:starts_note".to_string());
    }
    if normalized.starts_with('<') && normalized.ends_with('>') {
        bump("shape:tag_like".to_string());
    }

    features
}

/// Total number of feature occurrences
pub fn feature_total(features: &FeatureCounts) -> u64 {
    features.values().map(|&count| u64::from(count)).sum()
}
