//! Section-level regression metrics.
//!
//! Each case is a raw recipe text with the ingredient and step lists it must assemble
//! into, plus note fragments that must end up in notes and nowhere else.

use crate::assembler::assemble;
use crate::classifier::{ClassifierModel, ContextualPredictor};
use crate::dataset::{read_json, sorted_files};
use crate::error::ToolingError;
use crate::model::{RecipeDraft, SourceMetadata};
use crate::normalize::normalize_text;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub const MAX_NOTE_LEAKAGE_RATE: f64 = 0.05;
pub const MAX_SWAP_RATE: f64 = 0.08;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionCase {
    pub name: String,
    pub text: String,
    pub expected: ExpectedSections,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedSections {
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub notes_contains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseScore {
    pub name: String,
    pub exact_match: bool,
    pub note_leakage_rate: f64,
    pub swap_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionReport {
    pub exact_match_rate: f64,
    pub note_leakage_rate: f64,
    pub ingredient_step_swap_rate: f64,
    pub fixture_count: usize,
    pub cases: Vec<CaseScore>,
}

impl RegressionReport {
    pub fn passes(&self) -> bool {
        self.note_leakage_rate <= MAX_NOTE_LEAKAGE_RATE && self.ingredient_step_swap_rate <= MAX_SWAP_RATE
    }
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

fn sorted_folded<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut folded: Vec<String> = items.map(fold).collect();
    folded.sort();
    folded
}

/// Compare an assembled draft against the expected sections
pub fn score_case(name: &str, expected: &ExpectedSections, draft: &RecipeDraft) -> CaseScore {
    let ingredients: Vec<String> = draft.ingredients.iter().map(|line| fold(&line.text)).collect();
    let steps: Vec<String> = draft.steps.iter().map(|step| fold(step)).collect();
    let notes_blob = draft.notes.join("\n").to_lowercase();

    let expected_ingredients: Vec<String> = expected.ingredients.iter().map(|s| fold(s)).collect();
    let expected_steps: Vec<String> = expected.steps.iter().map(|s| fold(s)).collect();
    let expected_notes: Vec<String> = expected.notes_contains.iter().map(|s| fold(s)).collect();

    let exact_match = sorted_folded(draft.ingredients.iter().map(|line| line.text.as_str()))
        == sorted_folded(expected.ingredients.iter().map(String::as_str))
        && sorted_folded(draft.steps.iter().map(String::as_str))
            == sorted_folded(expected.steps.iter().map(String::as_str))
        && expected_notes.iter().all(|fragment| notes_blob.contains(fragment.as_str()));

    let leaked = expected_notes
        .iter()
        .filter(|fragment| {
            ingredients
                .iter()
                .chain(&steps)
                .any(|line| line.contains(fragment.as_str()))
        })
        .count();
    let note_leakage_rate = if expected_notes.is_empty() {
        0.0
    } else {
        leaked as f64 / expected_notes.len() as f64
    };

    let swapped = expected_ingredients
        .iter()
        .filter(|ingredient| steps.iter().any(|step| step.contains(ingredient.as_str())))
        .count()
        + expected_steps
            .iter()
            .filter(|step| ingredients.iter().any(|line| line.contains(step.as_str())))
            .count();
    let expected_total = (expected_ingredients.len() + expected_steps.len()).max(1);

    CaseScore {
        name: name.to_string(),
        exact_match,
        note_leakage_rate,
        swap_rate: swapped as f64 / expected_total as f64,
    }
}

/// Normalize, classify and assemble one case text
pub fn run_case(predictor: &ContextualPredictor, case: &RegressionCase, max_lines: usize) -> RecipeDraft {
    let lines = normalize_text(&case.text, max_lines);
    let labeled = predictor.label_lines(&lines);
    assemble(&labeled, &SourceMetadata::default())
}

/// All `*.json` cases under `dir`, sorted by file name
pub fn load_cases(dir: &Path) -> Result<Vec<RegressionCase>, ToolingError> {
    sorted_files(dir, ".json")?
        .iter()
        .map(|path| read_json(path))
        .collect()
}

pub fn run_regression(
    model: Arc<ClassifierModel>,
    dir: &Path,
    max_lines: usize,
) -> Result<RegressionReport, ToolingError> {
    let cases = load_cases(dir)?;
    if cases.is_empty() {
        return Err(ToolingError::InvalidDataset("No regression fixtures found".to_string()));
    }

    let predictor = ContextualPredictor::new(model);
    let scores: Vec<CaseScore> = cases
        .par_iter()
        .map(|case| {
            let draft = run_case(&predictor, case, max_lines);
            let score = score_case(&case.name, &case.expected, &draft);
            debug!(
                "{}: exact_match={} leakage={:.2} swap={:.2}",
                score.name, score.exact_match, score.note_leakage_rate, score.swap_rate
            );
            score
        })
        .collect();

    let count = scores.len() as f64;
    let report = RegressionReport {
        exact_match_rate: scores.iter().filter(|s| s.exact_match).count() as f64 / count,
        note_leakage_rate: scores.iter().map(|s| s.note_leakage_rate).sum::<f64>() / count,
        ingredient_step_swap_rate: scores.iter().map(|s| s.swap_rate).sum::<f64>() / count,
        fixture_count: scores.len(),
        cases: scores,
    };
    info!(
        "Regression over {} cases: exact {:.2}, leakage {:.2}, swap {:.2}",
        report.fixture_count, report.exact_match_rate, report.note_leakage_rate, report.ingredient_step_swap_rate
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngredientLine, Label};
    use std::fs;
    use tempfile::tempdir;

    fn draft(ingredients: &[&str], steps: &[&str], notes: &[&str]) -> RecipeDraft {
        RecipeDraft {
            title: Some("Chili".to_string()),
            ingredients: ingredients.iter().map(|text| IngredientLine::new(*text)).collect(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            notes: notes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn expected(ingredients: &[&str], steps: &[&str], notes: &[&str]) -> ExpectedSections {
        ExpectedSections {
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            notes_contains: notes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_exact_match_ignores_order_and_case() {
        let score = score_case(
            "chili",
            &expected(&["1 lb beef", "1 onion"], &["Brown the beef."], &["freezes well"]),
            &draft(&["1 Onion ", "1 lb beef"], &["brown the beef."], &["It FREEZES WELL for a month."]),
        );
        assert!(score.exact_match);
        assert_eq!(score.note_leakage_rate, 0.0);
        assert_eq!(score.swap_rate, 0.0);
    }

    #[test]
    fn test_leakage_and_swaps() {
        let score = score_case(
            "chili",
            &expected(&["1 onion"], &["Brown the beef.", "Simmer."], &["freezes well", "use chuck"]),
            &draft(
                &["1 onion", "brown the beef."],
                &["Simmer.", "Chili freezes well."],
                &["Use chuck for more flavor."],
            ),
        );
        assert!(!score.exact_match);
        assert_eq!(score.note_leakage_rate, 0.5);
        assert!((score.swap_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_regression_over_dir() {
        let dir = tempdir().unwrap();
        let case = serde_json::json!({
            "name": "pancakes",
            "text": "Pancakes\nIngredients\n2 eggs\n1 cup milk\nInstructions\n1. Whisk the eggs and milk.\n2. Cook on a hot griddle.",
            "expected": {
                "ingredients": ["2 eggs", "1 cup milk"],
                "steps": ["Whisk the eggs and milk.", "Cook on a hot griddle."],
                "notes_contains": []
            }
        });
        fs::write(dir.path().join("pancakes.json"), case.to_string()).unwrap();
        fs::write(dir.path().join("README.md"), "not a case").unwrap();

        let model = Arc::new(ClassifierModel::train(
            vec![
                ("Pancakes", Label::Title),
                ("2 eggs", Label::Ingredient),
                ("whisk the eggs", Label::Step),
                ("Ingredients", Label::Header),
            ],
            1.0,
            4,
        ));
        let report = run_regression(model, dir.path(), 400).unwrap();
        assert_eq!(report.fixture_count, 1);
        assert_eq!(report.exact_match_rate, 1.0);
        assert!(report.passes());
    }

    #[test]
    fn test_empty_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let model = Arc::new(ClassifierModel::train(vec![("Pancakes", Label::Title)], 1.0, 4));
        assert!(matches!(
            run_regression(model, dir.path(), 400),
            Err(ToolingError::InvalidDataset(_))
        ));
    }
}
