use super::{group_by_doc, load_documents, load_line_rows, DocFilter, LINES_SUFFIX};
use crate::error::ToolingError;
use crate::model::Label;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const REQUIRED_RECIPE_FIELDS: [&str; 4] = ["title", "ingredients", "steps", "notes"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    /// Every label of the closed set is present, defaulting to 0; invalid labels appear too
    pub label_counts: BTreeMap<String, usize>,
    pub source_counts: BTreeMap<String, usize>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Cross-check document fixtures against their line-level labels.
///
/// Structural problems are collected as messages; only unreadable files are errors.
pub fn validate_dataset(data_dir: &Path) -> Result<ValidationReport, ToolingError> {
    let documents = load_documents(data_dir)?;
    let rows = load_line_rows(data_dir, &DocFilter::default())?;

    let mut errors = Vec::new();
    let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut source_counts: BTreeMap<String, usize> = BTreeMap::new();

    for row in &rows {
        *label_counts.entry(row.label.clone()).or_insert(0) += 1;
        if row.label.parse::<Label>().is_err() || row.label != row.label.trim().to_lowercase() {
            errors.push(format!(
                "Invalid label '{}' in doc '{}' at line_index={}",
                row.label, row.doc_id, row.line_index
            ));
        }
    }

    if documents.is_empty() {
        errors.push("No document-level fixture files found under documents/*.doc.json".to_string());
    }

    let rows_by_doc = group_by_doc(&rows);
    for (doc_id, document) in &documents {
        *source_counts.entry(document.source_type.clone()).or_insert(0) += 1;

        for field in REQUIRED_RECIPE_FIELDS {
            if !document.target_recipe.contains_key(field) {
                errors.push(format!("Doc '{doc_id}' missing target_recipe field '{field}'"));
            }
        }

        let Some(doc_rows) = rows_by_doc.get(doc_id.as_str()) else {
            errors.push(format!(
                "Doc '{doc_id}' has no matching line-level file '{doc_id}{LINES_SUFFIX}'"
            ));
            continue;
        };

        if document.normalized_lines.len() != doc_rows.len() {
            errors.push(format!(
                "Doc '{doc_id}' has {} normalized_lines but {} line labels",
                document.normalized_lines.len(),
                doc_rows.len()
            ));
        }

        let seen: BTreeSet<usize> = doc_rows.iter().map(|row| row.line_index).collect();
        let expected: BTreeSet<usize> = (0..doc_rows.len()).collect();
        if seen != expected {
            errors.push(format!(
                "Doc '{doc_id}' line_index values must be contiguous from 0 to {}",
                doc_rows.len() as i64 - 1
            ));
        }

        for row in doc_rows {
            if let Some(expected_text) = document.normalized_lines.get(row.line_index) {
                if *expected_text != row.text {
                    errors.push(format!(
                        "Doc '{doc_id}' mismatch at line_index={} (document text != line-level text)",
                        row.line_index
                    ));
                }
            }
        }
    }

    for doc_id in rows_by_doc.keys() {
        if !documents.contains_key(*doc_id) {
            errors.push(format!("Line labels exist for unknown doc '{doc_id}'"));
        }
    }

    for label in Label::ALL {
        label_counts.entry(label.as_str().to_string()).or_insert(0);
    }

    debug!(
        "Validated {} documents and {} line rows: {} problems",
        documents.len(),
        rows.len(),
        errors.len()
    );
    Ok(ValidationReport {
        errors,
        label_counts,
        source_counts,
    })
}
