//! On-device artifact bundle: a directory holding the model JSON and a manifest.

use super::naive_bayes::ClassifierModel;
use crate::error::ToolingError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const BUNDLE_FORMAT: &str = "recipe-line-classifier";
pub const BUNDLE_VERSION: u32 = 1;
pub const MODEL_PAYLOAD: &str = "line_classifier.json";
pub const MANIFEST_FILE: &str = "Manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub bundle_format: String,
    pub bundle_version: u32,
    pub model_payload: String,
    pub source_model: String,
}

/// Where the bundle went; `requested` differs when a `.mlmodel` path was mapped
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedBundle {
    pub requested: PathBuf,
    pub bundle_dir: PathBuf,
    pub manifest: BundleManifest,
}

/// A `.mlmodel` output path becomes its compiled `.mlmodelc` directory
pub fn resolve_bundle_dir(out: &Path) -> PathBuf {
    if out.extension().is_some_and(|ext| ext == "mlmodel") {
        out.with_extension("mlmodelc")
    } else {
        out.to_path_buf()
    }
}

/// Validate the trained model and write it with its manifest into a bundle directory
pub fn export_model(model_path: &Path, out: &Path) -> Result<ExportedBundle, ToolingError> {
    if !model_path.exists() {
        return Err(ToolingError::InvalidDataset(format!(
            "Model not found: {}",
            model_path.display()
        )));
    }
    let model = ClassifierModel::load(model_path)?;

    let bundle_dir = resolve_bundle_dir(out);
    fs::create_dir_all(&bundle_dir).map_err(|e| ToolingError::io(&bundle_dir, e))?;
    model.save(&bundle_dir.join(MODEL_PAYLOAD))?;

    let manifest = BundleManifest {
        bundle_format: BUNDLE_FORMAT.to_string(),
        bundle_version: BUNDLE_VERSION,
        model_payload: MODEL_PAYLOAD.to_string(),
        source_model: model_path.display().to_string(),
    };
    let manifest_path = bundle_dir.join(MANIFEST_FILE);
    let payload =
        serde_json::to_string_pretty(&manifest).map_err(|e| ToolingError::json(&manifest_path, e))?;
    fs::write(&manifest_path, payload + "\n").map_err(|e| ToolingError::io(&manifest_path, e))?;

    info!("Exported model bundle to {}", bundle_dir.display());
    Ok(ExportedBundle {
        requested: out.to_path_buf(),
        bundle_dir,
        manifest,
    })
}
