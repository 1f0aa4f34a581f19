//! Fixture corpus tooling.
//!
//! A fixture root holds `documents/<id>.doc.json` (ordered normalized lines plus the
//! target recipe) and `lines/<id>.lines.jsonl` (one gold label per line).

mod corrections;
mod split;
mod table;
mod training;
mod validate;

pub use corrections::{export_correction, CorrectionPayload, ExportedFixture};
pub use split::{split_docs_for_holdout, split_bucket};
pub use table::{build_training_table, write_training_table, TrainingTableRow};
pub use training::{
    evaluate_classifier, predict_rows, train_classifier, EvaluationOptions, HoldoutExample,
    SplitFile, TrainOptions, TrainOutcome, MODEL_FILE, SPLIT_FILE,
};
pub use validate::{validate_dataset, ValidationReport};

use crate::error::ToolingError;
use crate::model::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DOCUMENTS_DIR: &str = "documents";
pub const LINES_DIR: &str = "lines";
pub const DOCUMENT_SUFFIX: &str = ".doc.json";
pub const LINES_SUFFIX: &str = ".lines.jsonl";

/// Document-level fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDocument {
    pub id: String,
    pub source_type: String,
    pub normalized_lines: Vec<String>,
    /// Kept loose so validation can report missing fields by name
    pub target_recipe: serde_json::Map<String, serde_json::Value>,
}

/// One labeled line from a `.lines.jsonl` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRow {
    #[serde(default)]
    pub doc_id: String,
    pub line_index: usize,
    pub text: String,
    /// Raw label text; may be outside the closed set until validated
    pub label: String,
}

impl LineRow {
    pub fn gold_label(&self) -> Result<Label, ToolingError> {
        self.label.parse().map_err(|_| {
            ToolingError::InvalidDataset(format!(
                "Invalid label '{}' in doc '{}' at line_index={}",
                self.label, self.doc_id, self.line_index
            ))
        })
    }
}

/// Include / exclude doc-id prefix filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocFilter {
    pub include_prefixes: Vec<String>,
    pub exclude_prefixes: Vec<String>,
}

impl DocFilter {
    pub fn excluding(prefix: impl Into<String>) -> Self {
        Self {
            include_prefixes: Vec::new(),
            exclude_prefixes: vec![prefix.into()],
        }
    }

    pub fn accepts(&self, doc_id: &str) -> bool {
        if !self.include_prefixes.is_empty() && !matches_prefix(doc_id, &self.include_prefixes) {
            return false;
        }
        !matches_prefix(doc_id, &self.exclude_prefixes)
    }
}

fn matches_prefix(doc_id: &str, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .map(|prefix| prefix.trim())
        .any(|prefix| !prefix.is_empty() && doc_id.starts_with(prefix))
}

/// Files in `dir` ending with `suffix`, sorted by path; a missing directory is empty
pub(crate) fn sorted_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>, ToolingError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| ToolingError::io(dir, e))? {
        let path = entry.map_err(|e| ToolingError::io(dir, e))?.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(suffix));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ToolingError> {
    let raw = fs::read_to_string(path).map_err(|e| ToolingError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| ToolingError::json(path, e))
}

/// One JSON value per non-blank line
pub(crate) fn read_json_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ToolingError> {
    let raw = fs::read_to_string(path).map_err(|e| ToolingError::io(path, e))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| ToolingError::json(path, e)))
        .collect()
}

/// Pretty JSON with a trailing newline, creating parent directories
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ToolingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ToolingError::io(parent, e))?;
    }
    let payload = serde_json::to_string_pretty(value).map_err(|e| ToolingError::json(path, e))?;
    fs::write(path, payload + "\n").map_err(|e| ToolingError::io(path, e))
}

/// All document fixtures keyed by id
pub fn load_documents(data_dir: &Path) -> Result<BTreeMap<String, DatasetDocument>, ToolingError> {
    let mut documents = BTreeMap::new();
    for path in sorted_files(&data_dir.join(DOCUMENTS_DIR), DOCUMENT_SUFFIX)? {
        let document: DatasetDocument = read_json(&path)?;
        documents.insert(document.id.clone(), document);
    }
    Ok(documents)
}

/// Line rows of every accepted doc, sorted by `(doc_id, line_index)`
pub fn load_line_rows(data_dir: &Path, filter: &DocFilter) -> Result<Vec<LineRow>, ToolingError> {
    let mut rows = Vec::new();
    for path in sorted_files(&data_dir.join(LINES_DIR), LINES_SUFFIX)? {
        let doc_id = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.trim_end_matches(LINES_SUFFIX).to_string())
            .unwrap_or_default();
        if !filter.accepts(&doc_id) {
            continue;
        }

        for mut row in read_json_lines::<LineRow>(&path)? {
            row.doc_id = doc_id.clone();
            rows.push(row);
        }
    }

    rows.sort_by(|a, b| {
        a.doc_id
            .cmp(&b.doc_id)
            .then(a.line_index.cmp(&b.line_index))
    });
    Ok(rows)
}

/// Rows grouped per doc, keeping row order
pub fn group_by_doc(rows: &[LineRow]) -> BTreeMap<&str, Vec<&LineRow>> {
    let mut grouped: BTreeMap<&str, Vec<&LineRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.doc_id.as_str()).or_default().push(row);
    }
    grouped
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Write a doc + line fixture pair whose target is derived from the labels
    pub fn write_fixture(root: &Path, id: &str, lines: &[(&str, &str)]) {
        let texts: Vec<&str> = lines.iter().map(|(text, _)| *text).collect();
        let with = |label: &str| -> Vec<&str> {
            lines
                .iter()
                .filter(|(_, l)| *l == label)
                .map(|(text, _)| *text)
                .collect()
        };
        let document = serde_json::json!({
            "id": id,
            "source_type": "web",
            "normalized_lines": texts,
            "target_recipe": {
                "title": texts.first().copied().unwrap_or("Untitled"),
                "ingredients": with("ingredient"),
                "steps": with("step"),
                "notes": with("note"),
            }
        });
        fs::create_dir_all(root.join(DOCUMENTS_DIR)).unwrap();
        fs::create_dir_all(root.join(LINES_DIR)).unwrap();
        fs::write(
            root.join(DOCUMENTS_DIR).join(format!("{id}{DOCUMENT_SUFFIX}")),
            document.to_string(),
        )
        .unwrap();
        let jsonl: String = lines
            .iter()
            .enumerate()
            .map(|(idx, (text, label))| {
                serde_json::json!({"line_index": idx, "text": text, "label": label}).to_string() + "\n"
            })
            .collect();
        fs::write(root.join(LINES_DIR).join(format!("{id}{LINES_SUFFIX}")), jsonl).unwrap();
    }
}
