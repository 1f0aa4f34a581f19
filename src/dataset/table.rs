use super::{load_line_rows, DocFilter};
use crate::classifier::features::feature_total;
use crate::classifier::{extract_features, normalize_for_features};
use crate::error::ToolingError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

const FEATURE_PREVIEW_LEN: usize = 40;

/// Materialized training row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingTableRow {
    pub doc_id: String,
    pub line_index: usize,
    pub text: String,
    pub normalized_text: String,
    pub label: String,
    pub feature_count: u64,
    /// First sorted feature keys
    pub feature_preview: Vec<String>,
}

pub fn build_training_table(
    data_dir: &Path,
    filter: &DocFilter,
    max_char_ngram: usize,
) -> Result<Vec<TrainingTableRow>, ToolingError> {
    let rows = load_line_rows(data_dir, filter)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let features = extract_features(&row.text, max_char_ngram);
            TrainingTableRow {
                normalized_text: normalize_for_features(&row.text),
                feature_count: feature_total(&features),
                feature_preview: features.into_keys().take(FEATURE_PREVIEW_LEN).collect(),
                doc_id: row.doc_id,
                line_index: row.line_index,
                text: row.text,
                label: row.label,
            }
        })
        .collect())
}

/// Write rows as JSONL
pub fn write_training_table(path: &Path, rows: &[TrainingTableRow]) -> Result<(), ToolingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ToolingError::io(parent, e))?;
    }
    let mut file = fs::File::create(path).map_err(|e| ToolingError::io(path, e))?;
    for row in rows {
        let line = serde_json::to_string(row).map_err(|e| ToolingError::json(path, e))?;
        writeln!(file, "{line}").map_err(|e| ToolingError::io(path, e))?;
    }
    Ok(())
}
