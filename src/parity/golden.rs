//! Pinned real-world pages that once broke extraction, with the assertions they must keep passing.

use crate::assembler::assemble;
use crate::classifier::{ClassifierModel, ContextualPredictor};
use crate::dataset::read_json;
use crate::error::ToolingError;
use crate::model::RecipeDraft;
use crate::normalize::normalize_lines;
use crate::pipelines;
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenCase {
    pub name: String,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Inline page markup
    #[serde(default)]
    pub html: Option<String>,
    /// Saved page, relative to the case file
    #[serde(default)]
    pub html_file: Option<PathBuf>,
    #[serde(default)]
    pub expect: GoldenExpectations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoldenExpectations {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ingredient_count: Option<usize>,
    #[serde(default)]
    pub step_count: Option<usize>,
    #[serde(default)]
    pub max_steps: Option<usize>,
    /// Fragments each expected somewhere in the steps (case-insensitive)
    #[serde(default)]
    pub steps_contain: Vec<String>,
    #[serde(default)]
    pub notes_contain: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldenResult {
    pub name: String,
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Cases from a JSON array file, with `html_file` resolved against its directory
pub fn load_golden_cases(path: &Path) -> Result<Vec<GoldenCase>, ToolingError> {
    let mut cases: Vec<GoldenCase> = read_json(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for case in &mut cases {
        if let Some(file) = case.html_file.take() {
            case.html_file = Some(if file.is_absolute() { file } else { base.join(file) });
        }
    }
    Ok(cases)
}

/// Assertion failures of one draft; empty when everything holds
pub fn check_expectations(expect: &GoldenExpectations, draft: &RecipeDraft) -> Vec<String> {
    let mut failures = Vec::new();

    if let Some(title) = &expect.title {
        let actual = draft.title.as_deref().unwrap_or_default();
        if actual.trim() != title.trim() {
            failures.push(format!("title: expected '{title}', got '{actual}'"));
        }
    }
    if let Some(count) = expect.ingredient_count {
        if draft.ingredients.len() != count {
            failures.push(format!(
                "ingredient_count: expected {count}, got {}",
                draft.ingredients.len()
            ));
        }
    }
    if let Some(count) = expect.step_count {
        if draft.steps.len() != count {
            failures.push(format!("step_count: expected {count}, got {}", draft.steps.len()));
        }
    }
    if let Some(max) = expect.max_steps {
        if draft.steps.len() > max {
            failures.push(format!("max_steps: expected at most {max}, got {}", draft.steps.len()));
        }
    }

    let steps = draft.steps.join("\n").to_lowercase();
    for fragment in &expect.steps_contain {
        if !steps.contains(&fragment.to_lowercase()) {
            failures.push(format!("steps_contain: '{fragment}' not found"));
        }
    }
    let notes = draft.notes.join("\n").to_lowercase();
    for fragment in &expect.notes_contain {
        if !notes.contains(&fragment.to_lowercase()) {
            failures.push(format!("notes_contain: '{fragment}' not found"));
        }
    }

    failures
}

fn extract(case: &GoldenCase, predictor: &ContextualPredictor, max_lines: usize) -> Result<RecipeDraft, String> {
    let html = match (&case.html, &case.html_file) {
        (Some(html), _) => html.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?,
        (None, None) => return Err("case has neither html nor html_file".to_string()),
    };
    let acquired = pipelines::html::process(&html, case.source_url.as_deref())
        .map_err(|e| format!("acquisition failed: {e}"))?;
    let lines = normalize_lines(&acquired.lines, max_lines);
    let labeled = predictor.label_lines(&lines);
    Ok(assemble(&labeled, &acquired.metadata))
}

/// Run every case through HTML acquisition, the classifier and the assembler
pub fn run_golden_cases(
    cases: &[GoldenCase],
    model: Arc<ClassifierModel>,
    max_lines: usize,
) -> Vec<GoldenResult> {
    let predictor = ContextualPredictor::new(model);
    let results: Vec<GoldenResult> = cases
        .par_iter()
        .map(|case| {
            let failures = match extract(case, &predictor, max_lines) {
                Ok(draft) => check_expectations(&case.expect, &draft),
                Err(reason) => vec![reason],
            };
            if !failures.is_empty() {
                warn!("Golden case '{}' failed: {}", case.name, failures.join("; "));
            }
            GoldenResult {
                name: case.name.clone(),
                passed: failures.is_empty(),
                failures,
            }
        })
        .collect();

    info!(
        "Golden cases: {}/{} passed",
        results.iter().filter(|r| r.passed).count(),
        results.len()
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngredientLine, Label};
    use tempfile::tempdir;

    #[test]
    fn test_check_expectations() {
        let draft = RecipeDraft {
            title: Some("Cookies".to_string()),
            ingredients: vec![IngredientLine::new("1 cup butter")],
            steps: vec!["Cream the butter.".to_string(), "Bake.".to_string()],
            notes: vec!["Dough keeps 3 days.".to_string()],
            ..Default::default()
        };
        let expect = GoldenExpectations {
            title: Some("Cookies".to_string()),
            ingredient_count: Some(1),
            max_steps: Some(4),
            steps_contain: vec!["cream the butter".to_string()],
            notes_contain: vec!["keeps 3 days".to_string()],
            ..Default::default()
        };
        assert!(check_expectations(&expect, &draft).is_empty());

        let strict = GoldenExpectations {
            step_count: Some(4),
            steps_contain: vec!["chill".to_string()],
            ..Default::default()
        };
        assert_eq!(
            check_expectations(&strict, &draft),
            vec!["step_count: expected 4, got 2", "steps_contain: 'chill' not found"]
        );
    }

    #[test]
    fn test_collapsed_instruction_blob_case() {
        let dir = tempdir().unwrap();
        let page = r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "Recipe", "name": "Brown Butter Cookies",
             "recipeIngredient": ["1 cup butter", "2 cups flour", "1 cup sugar"],
             "recipeInstructions": "1. Brown the butter and let it cool. 2. Whisk in the sugar. 3. Fold in the flour. 4. Bake for 10 minutes."}
        </script></head><body></body></html>"#;
        fs::write(dir.path().join("cookies.html"), page).unwrap();
        fs::write(
            dir.path().join("golden.json"),
            r#"[{"name": "cookies", "source_url": "https://cookies.example.com/brown-butter",
                 "html_file": "cookies.html",
                 "expect": {"title": "Brown Butter Cookies", "ingredient_count": 3, "step_count": 4}},
                {"name": "missing", "expect": {}}]"#,
        )
        .unwrap();

        let cases = load_golden_cases(&dir.path().join("golden.json")).unwrap();
        assert_eq!(cases[0].html_file.as_deref(), Some(dir.path().join("cookies.html").as_path()));

        let model = Arc::new(ClassifierModel::train(
            vec![
                ("Brown Butter Cookies", Label::Title),
                ("1 cup butter", Label::Ingredient),
                ("whisk in the sugar", Label::Step),
                ("Ingredients", Label::Header),
            ],
            1.0,
            4,
        ));
        let results = run_golden_cases(&cases, model, 400);
        assert!(results[0].passed, "{:?}", results[0].failures);
        assert!(!results[1].passed);
        assert_eq!(results[1].failures, vec!["case has neither html nor html_file"]);
    }
}
