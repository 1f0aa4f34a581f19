//! Reading-order reconstruction for recognized text.
//!
//! Two orderings are built from the same observations: a single top-to-bottom pass over
//! rows, and a two-column split at the widest gutter. Both are scored and the better one
//! is kept.

use super::Observation;
use crate::assembler::patterns::{
    is_ocr_artifact_line, looks_like_ingredient_line, COOKING_VERBS,
};
use crate::config::OcrConfig;
use crate::error::ExtractError;
use crate::model::{Line, Region};
use crate::normalize::{clean_text, dedupe_key};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const INGREDIENT_WEIGHT: f32 = 1.6;
const ACTION_WEIGHT: f32 = 1.2;
const LINE_BONUS: f32 = 0.3;
const NOISE_PENALTY: f32 = 2.0;
const COLLISION_PENALTY: f32 = 1.5;

static INGREDIENT_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:to taste|pinch|divided|chopped|minced|diced|sliced|grated|melted|softened|optional)\b")
        .unwrap()
});
static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{1,2}\s*[.)]?\s*").unwrap());
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").unwrap());

const DANGLING_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "for", "in", "of", "on", "or", "the", "to", "with",
];

/// Which ordering a reconstruction settled on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutChoice {
    SinglePass,
    TwoColumn,
}

/// Heuristic quality of one candidate ordering
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrderingScore {
    pub lines: usize,
    pub ingredient_lines: usize,
    pub action_lines: usize,
    pub noisy_lines: usize,
    pub collisions: usize,
    pub total: f32,
}

#[derive(Debug, Clone)]
pub struct LayoutResult {
    pub lines: Vec<Line>,
    pub choice: LayoutChoice,
    pub single_pass: OrderingScore,
    pub two_column: Option<OrderingScore>,
}

/// Order observations into text lines, or fail when no ordering is usable
pub fn reconstruct(
    observations: &[Observation],
    config: &OcrConfig,
) -> Result<LayoutResult, ExtractError> {
    let kept = filter_observations(observations, config.min_confidence);
    debug!(
        "OCR layout: kept {} of {} observations",
        kept.len(),
        observations.len()
    );

    let single_lines = rows_to_lines(group_rows(&kept, config.row_tolerance));
    let single_pass = score_ordering(&single_lines);

    let column_lines = split_columns(&kept, config).map(|(left, right)| {
        let mut lines = rows_to_lines(group_rows(&left, config.row_tolerance));
        lines.extend(rows_to_lines(group_rows(&right, config.row_tolerance)));
        sanitize_column_lines(lines)
    });
    let two_column = column_lines.as_deref().map(score_ordering);

    let usable = |score: &OrderingScore| {
        score.lines >= config.min_lines && score.noisy_lines * 2 < score.lines
    };

    let prefer_column = two_column
        .as_ref()
        .is_some_and(|column| prefers_column(&single_pass, column, config));

    let (choice, lines) = match (prefer_column, column_lines, two_column.as_ref()) {
        (true, Some(lines), Some(column)) if usable(column) => (LayoutChoice::TwoColumn, lines),
        (_, column_lines, column) if !usable(&single_pass) => match (column_lines, column) {
            (Some(lines), Some(column)) if usable(column) => (LayoutChoice::TwoColumn, lines),
            _ => {
                return Err(ExtractError::OcrUnusable(format!(
                    "{} lines ({} noisy) after layout reconstruction",
                    single_pass.lines, single_pass.noisy_lines
                )))
            }
        },
        _ => (LayoutChoice::SinglePass, single_lines),
    };

    debug!(
        "OCR layout: single-pass score {:.2}, two-column score {:?}, chose {:?}",
        single_pass.total,
        two_column.map(|score| score.total),
        choice
    );

    Ok(LayoutResult {
        lines: lines
            .into_iter()
            .map(|ordered| Line {
                text: ordered.text,
                region: Some(ordered.region),
            })
            .collect(),
        choice,
        single_pass,
        two_column,
    })
}

/// Column ordering wins by a clear margin, by resolving collisions, or by cutting noise
fn prefers_column(single: &OrderingScore, column: &OrderingScore, config: &OcrConfig) -> bool {
    let delta = column.total - single.total;
    if delta > config.score_margin {
        return true;
    }
    let comparable = delta >= -config.score_tolerance;
    if single.collisions >= 2 && column.collisions < single.collisions && comparable {
        return true;
    }
    column.noisy_lines < single.noisy_lines && delta.abs() <= config.score_tolerance
}

#[derive(Debug, Clone)]
struct OrderedLine {
    text: String,
    region: Region,
}

fn filter_observations(observations: &[Observation], min_confidence: f32) -> Vec<Observation> {
    let mut kept: Vec<Observation> = Vec::with_capacity(observations.len());
    for observation in observations {
        if observation.confidence < min_confidence {
            continue;
        }
        let text = clean_text(&observation.text);
        if text.is_empty() {
            continue;
        }
        let key = dedupe_key(&text);
        let line_height = observation.bbox.height.max(1e-6);
        let duplicate = kept.iter().any(|other| {
            dedupe_key(&other.text) == key
                && (other.center_y() - observation.center_y()).abs() < line_height
                && (other.left() - observation.left()).abs() < line_height
        });
        if duplicate {
            continue;
        }
        kept.push(Observation {
            text,
            ..observation.clone()
        });
    }
    kept
}

/// Observations whose vertical centers are closer than `tolerance` × line height share a row
fn group_rows(observations: &[Observation], tolerance: f32) -> Vec<Vec<Observation>> {
    let mut sorted: Vec<Observation> = observations.to_vec();
    sorted.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then(a.left().total_cmp(&b.left()))
    });

    let mut rows: Vec<Vec<Observation>> = Vec::new();
    for observation in sorted {
        let joins_last = rows.last().is_some_and(|row| {
            let anchor = &row[0];
            let height = anchor.bbox.height.max(observation.bbox.height);
            (observation.center_y() - anchor.center_y()).abs() < tolerance * height
        });
        match rows.last_mut() {
            Some(row) if joins_last => row.push(observation),
            _ => rows.push(vec![observation]),
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.left().total_cmp(&b.left()));
    }
    rows
}

fn rows_to_lines(rows: Vec<Vec<Observation>>) -> Vec<OrderedLine> {
    rows.into_iter()
        .filter(|row| !row.is_empty())
        .map(|row| {
            let text = row
                .iter()
                .map(|o| o.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let left = row.iter().map(Observation::left).fold(f32::INFINITY, f32::min);
            let right = row.iter().map(Observation::right).fold(f32::NEG_INFINITY, f32::max);
            let top = row.iter().map(|o| o.bbox.y).fold(f32::INFINITY, f32::min);
            let bottom = row
                .iter()
                .map(|o| o.bbox.y + o.bbox.height)
                .fold(f32::NEG_INFINITY, f32::max);
            OrderedLine {
                text: clean_text(&text),
                region: Region {
                    x: left,
                    y: top,
                    width: right - left,
                    height: bottom - top,
                },
            }
        })
        .collect()
}

/// Split at the widest gap between consecutive left edges, if it is a real gutter
fn split_columns(
    observations: &[Observation],
    config: &OcrConfig,
) -> Option<(Vec<Observation>, Vec<Observation>)> {
    if observations.len() < config.min_column_members * 2 {
        return None;
    }

    let page_left = observations.iter().map(Observation::left).fold(f32::INFINITY, f32::min);
    let page_right = observations
        .iter()
        .map(Observation::right)
        .fold(f32::NEG_INFINITY, f32::max);
    let page_width = page_right - page_left;
    if page_width <= 0.0 {
        return None;
    }

    let mut edges: Vec<f32> = observations.iter().map(Observation::left).collect();
    edges.sort_by(f32::total_cmp);

    let (gap, split_at) = edges
        .windows(2)
        .map(|pair| (pair[1] - pair[0], pair[1]))
        .fold((0.0f32, 0.0f32), |best, candidate| {
            if candidate.0 > best.0 {
                candidate
            } else {
                best
            }
        });

    if gap < config.min_column_gap * page_width {
        return None;
    }

    let (left, right): (Vec<Observation>, Vec<Observation>) = observations
        .iter()
        .cloned()
        .partition(|observation| observation.left() < split_at);

    if left.len() < config.min_column_members || right.len() < config.min_column_members {
        return None;
    }
    debug!(
        "OCR layout: column gutter {:.3} at x={:.3} ({} | {})",
        gap,
        split_at,
        left.len(),
        right.len()
    );
    Some((left, right))
}

/// Lone short token that is not a quantity (`re`, `ch`)
fn is_truncated_token(text: &str) -> bool {
    let mut words = text.split_whitespace();
    match (words.next(), words.next()) {
        (Some(word), None) => {
            !word.chars().any(|c| c.is_ascii_digit())
                && word.chars().filter(|c| c.is_alphanumeric()).count() < 3
        }
        _ => false,
    }
}

fn is_dangling_fragment(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    DANGLING_WORDS.contains(&lowered.trim_end_matches(|c: char| !c.is_alphanumeric()))
}

fn sanitize_column_lines(lines: Vec<OrderedLine>) -> Vec<OrderedLine> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .filter(|line| {
            !is_truncated_token(&line.text)
                && !is_dangling_fragment(&line.text)
                && !is_ocr_artifact_line(&line.text)
        })
        .filter(|line| {
            let key = line.text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            seen.insert(key)
        })
        .collect()
}

fn looks_like_ingredient(text: &str) -> bool {
    looks_like_ingredient_line(text) || INGREDIENT_KEYWORDS.is_match(text)
}

fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}

fn looks_like_action(text: &str) -> bool {
    let stripped = LEADING_NUMBER.replace(text, "");
    words(&stripped)
        .first()
        .is_some_and(|first| COOKING_VERBS.contains(&first.as_str()))
}

/// Ingredient text with an instruction verb further along: two columns bled into one row
fn is_collision(text: &str) -> bool {
    if !looks_like_ingredient_line(text) {
        return false;
    }
    let tokens = words(text);
    tokens
        .iter()
        .skip(1)
        .any(|token| COOKING_VERBS.contains(&token.as_str()))
}

fn is_noisy(text: &str) -> bool {
    if is_ocr_artifact_line(text) || is_truncated_token(text) {
        return true;
    }
    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    let letters = visible.iter().filter(|c| c.is_alphabetic()).count();
    visible.len() >= 6 && letters * 2 < visible.len()
}

fn score_ordering(lines: &[OrderedLine]) -> OrderingScore {
    let mut score = OrderingScore {
        lines: lines.len(),
        ..Default::default()
    };
    for line in lines {
        let text = line.text.as_str();
        if looks_like_ingredient(text) {
            score.ingredient_lines += 1;
        }
        if looks_like_action(text) {
            score.action_lines += 1;
        }
        if is_noisy(text) {
            score.noisy_lines += 1;
        }
        if is_collision(text) {
            score.collisions += 1;
        }
    }
    score.total = INGREDIENT_WEIGHT * score.ingredient_lines as f32
        + ACTION_WEIGHT * score.action_lines as f32
        + LINE_BONUS * score.lines as f32
        - NOISE_PENALTY * score.noisy_lines as f32
        - COLLISION_PENALTY * score.collisions as f32;
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(text: &str, x: f32, y: f32, width: f32) -> Observation {
        Observation::new(
            text,
            0.9,
            Region {
                x,
                y,
                width,
                height: 0.02,
            },
        )
    }

    fn texts(result: &LayoutResult) -> Vec<&str> {
        result.lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_single_column_reads_top_to_bottom() {
        let observations = vec![
            obs("Whisk the eggs.", 0.1, 0.30, 0.4),
            obs("Pancakes", 0.1, 0.10, 0.3),
            obs("2 eggs", 0.1, 0.20, 0.2),
            obs("1 cup milk", 0.1, 0.25, 0.2),
        ];
        let result = reconstruct(&observations, &OcrConfig::default()).unwrap();
        assert_eq!(result.choice, LayoutChoice::SinglePass);
        assert_eq!(
            texts(&result),
            vec!["Pancakes", "2 eggs", "1 cup milk", "Whisk the eggs."]
        );
        assert!(result.lines[0].region.is_some());
    }

    #[test]
    fn test_words_on_one_row_join_left_to_right() {
        let observations = vec![
            obs("flour", 0.30, 0.201, 0.1),
            obs("2", 0.10, 0.200, 0.02),
            obs("cups", 0.15, 0.199, 0.1),
            obs("Stir well.", 0.10, 0.30, 0.2),
        ];
        let result = reconstruct(&observations, &OcrConfig::default()).unwrap();
        assert_eq!(texts(&result), vec!["2 cups flour", "Stir well."]);
    }

    #[test]
    fn test_two_column_page_is_read_column_by_column() {
        let left = ["Ingredients", "2 cups flour", "1 tsp salt", "3 eggs"];
        let right = [
            "Instructions",
            "Preheat the oven to 350.",
            "Whisk the eggs.",
            "Bake for 20 minutes.",
        ];
        let mut observations = Vec::new();
        for (row, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let y = 0.1 + row as f32 * 0.05;
            observations.push(obs(l, 0.05, y, 0.3));
            observations.push(obs(r, 0.55, y, 0.4));
        }

        let result = reconstruct(&observations, &OcrConfig::default()).unwrap();
        assert_eq!(result.choice, LayoutChoice::TwoColumn);
        assert_eq!(
            texts(&result),
            vec![
                "Ingredients",
                "2 cups flour",
                "1 tsp salt",
                "3 eggs",
                "Instructions",
                "Preheat the oven to 350.",
                "Whisk the eggs.",
                "Bake for 20 minutes.",
            ]
        );
        assert!(result.single_pass.collisions >= 2);
        assert_eq!(result.two_column.unwrap().collisions, 0);
    }

    #[test]
    fn test_low_confidence_and_duplicates_are_dropped() {
        let mut faint = obs("smudge", 0.1, 0.15, 0.1);
        faint.confidence = 0.1;
        let observations = vec![
            obs("Toast", 0.1, 0.10, 0.2),
            obs("Toast", 0.1, 0.105, 0.2),
            faint,
            obs("Butter the bread.", 0.1, 0.20, 0.3),
        ];
        let result = reconstruct(&observations, &OcrConfig::default()).unwrap();
        assert_eq!(texts(&result), vec!["Toast", "Butter the bread."]);
    }

    #[test]
    fn test_too_few_lines_is_unusable() {
        let observations = vec![obs("Soup", 0.1, 0.1, 0.2)];
        let result = reconstruct(&observations, &OcrConfig::default());
        assert!(matches!(result, Err(ExtractError::OcrUnusable(_))));

        let noise = vec![obs("~~", 0.1, 0.1, 0.1), obs("##", 0.1, 0.2, 0.1)];
        assert!(reconstruct(&noise, &OcrConfig::default()).is_err());
    }

    #[test]
    fn test_column_sanitizer() {
        let line = |text: &str| OrderedLine {
            text: text.to_string(),
            region: Region {
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
            },
        };
        let lines = vec![
            line("2 cups flour"),
            line("re"),
            line("the"),
            line("Created by TemplateLab"),
            line("2  Cups flour"),
            line("Salt"),
        ];
        let kept: Vec<String> = sanitize_column_lines(lines).into_iter().map(|l| l.text).collect();
        assert_eq!(kept, vec!["2 cups flour", "Salt"]);
    }
}
