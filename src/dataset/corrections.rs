use super::{write_json, DatasetDocument, DOCUMENTS_DIR, DOCUMENT_SUFFIX, LINES_DIR, LINES_SUFFIX};
use crate::error::ToolingError;
use crate::model::Label;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A manual correction: the lines of a document as the user relabeled them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPayload {
    pub id: String,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub title: Option<String>,
    pub lines: Vec<String>,
    pub labels: Vec<String>,
}

fn default_source_type() -> String {
    "manual_edge".to_string()
}

/// Paths written by [`export_correction`]
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFixture {
    pub document_path: PathBuf,
    pub lines_path: PathBuf,
}

/// Turn a correction into a document + line fixture pair under `out_dir`
pub fn export_correction(
    payload: &CorrectionPayload,
    out_dir: &Path,
) -> Result<ExportedFixture, ToolingError> {
    if payload.lines.len() != payload.labels.len() {
        return Err(ToolingError::InvalidDataset(
            "lines and labels must have equal length".to_string(),
        ));
    }
    let invalid: Vec<&str> = payload
        .labels
        .iter()
        .filter(|label| label.parse::<Label>().is_err())
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(ToolingError::InvalidDataset(format!("invalid labels: {invalid:?}")));
    }
    let labels: Vec<Label> = payload
        .labels
        .iter()
        .filter_map(|label| label.parse().ok())
        .collect();

    let with_label = |wanted: Label| -> Vec<serde_json::Value> {
        payload
            .lines
            .iter()
            .zip(&labels)
            .filter(|(_, label)| **label == wanted)
            .map(|(line, _)| serde_json::Value::String(line.clone()))
            .collect()
    };
    let title = payload
        .title
        .clone()
        .or_else(|| payload.lines.first().cloned())
        .unwrap_or_else(|| "Untitled".to_string());

    let mut target_recipe = serde_json::Map::new();
    target_recipe.insert("title".to_string(), title.into());
    target_recipe.insert("ingredients".to_string(), with_label(Label::Ingredient).into());
    target_recipe.insert("steps".to_string(), with_label(Label::Step).into());
    target_recipe.insert("notes".to_string(), with_label(Label::Note).into());

    let document = DatasetDocument {
        id: payload.id.clone(),
        source_type: payload.source_type.clone(),
        normalized_lines: payload.lines.clone(),
        target_recipe,
    };

    let document_path = out_dir
        .join(DOCUMENTS_DIR)
        .join(format!("{}{DOCUMENT_SUFFIX}", payload.id));
    write_json(&document_path, &document)?;

    let lines_dir = out_dir.join(LINES_DIR);
    fs::create_dir_all(&lines_dir).map_err(|e| ToolingError::io(&lines_dir, e))?;
    let lines_path = lines_dir.join(format!("{}{LINES_SUFFIX}", payload.id));
    let mut file = fs::File::create(&lines_path).map_err(|e| ToolingError::io(&lines_path, e))?;
    for (index, (text, label)) in payload.lines.iter().zip(&labels).enumerate() {
        let row = serde_json::json!({
            "line_index": index,
            "text": text,
            "label": label,
        });
        writeln!(file, "{row}").map_err(|e| ToolingError::io(&lines_path, e))?;
    }

    info!("Exported correction '{}' ({} lines)", payload.id, payload.lines.len());
    Ok(ExportedFixture {
        document_path,
        lines_path,
    })
}

#[cfg(test)]
mod tests {
    use super::super::validate_dataset;
    use super::*;
    use tempfile::tempdir;

    fn payload(lines: &[&str], labels: &[&str]) -> CorrectionPayload {
        serde_json::from_value(serde_json::json!({
            "id": "ocr_fix_1",
            "lines": lines,
            "labels": labels,
        }))
        .unwrap()
    }

    #[test]
    fn test_export_produces_valid_fixture() {
        let dir = tempdir().unwrap();
        let correction = payload(
            &["Lemon Bars", "1 cup flour", "Bake 20 minutes.", "Keeps 3 days."],
            &["title", "ingredient", "step", "note"],
        );
        assert_eq!(correction.source_type, "manual_edge");

        let exported = export_correction(&correction, dir.path()).unwrap();
        let document: DatasetDocument =
            serde_json::from_str(&fs::read_to_string(&exported.document_path).unwrap()).unwrap();
        assert_eq!(document.target_recipe["title"], "Lemon Bars");
        assert_eq!(document.target_recipe["steps"], serde_json::json!(["Bake 20 minutes."]));
        assert_eq!(document.target_recipe["notes"], serde_json::json!(["Keeps 3 days."]));

        let report = validate_dataset(dir.path()).unwrap();
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.source_counts["manual_edge"], 1);
    }

    #[test]
    fn test_rejects_bad_payloads() {
        let dir = tempdir().unwrap();
        let uneven = payload(&["Lemon Bars", "1 cup flour"], &["title"]);
        assert!(matches!(
            export_correction(&uneven, dir.path()),
            Err(ToolingError::InvalidDataset(_))
        ));

        let invalid = payload(&["Lemon Bars"], &["dessert"]);
        match export_correction(&invalid, dir.path()) {
            Err(ToolingError::InvalidDataset(message)) => assert!(message.contains("dessert")),
            other => panic!("expected invalid labels, got {other:?}"),
        }
    }

    #[test]
    fn test_untitled_when_empty() {
        let dir = tempdir().unwrap();
        let exported = export_correction(&payload(&[], &[]), dir.path()).unwrap();
        let document: DatasetDocument =
            serde_json::from_str(&fs::read_to_string(exported.document_path).unwrap()).unwrap();
        assert_eq!(document.target_recipe["title"], "Untitled");
    }
}
