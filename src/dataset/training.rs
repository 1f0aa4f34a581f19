use super::{group_by_doc, load_line_rows, split_docs_for_holdout, write_json, DocFilter, LineRow};
use crate::classifier::{compute_metrics, ClassifierModel, ContextualPredictor, EvaluatedLine, Metrics};
use crate::config::ClassifierConfig;
use crate::error::ToolingError;
use crate::model::Label;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MODEL_FILE: &str = "line_classifier.json";
pub const SPLIT_FILE: &str = "split.json";

#[derive(Debug, Clone, PartialEq)]
pub struct TrainOptions {
    pub filter: DocFilter,
    pub holdout_ratio: f64,
    pub split_seed: String,
    pub alpha: f64,
    pub max_char_ngram: usize,
}

impl TrainOptions {
    /// Options from configuration; reserved holdout docs are excluded from training
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            filter: DocFilter::excluding(config.holdout_prefix.clone()),
            holdout_ratio: config.holdout_ratio,
            split_seed: config.split_seed.clone(),
            alpha: config.alpha,
            max_char_ngram: config.max_char_ngram,
        }
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldoutExample {
    pub doc_id: String,
    pub line_index: usize,
}

/// `split.json` written next to the trained model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitFile {
    pub train_docs: Vec<String>,
    pub holdout_docs: Vec<String>,
    #[serde(default)]
    pub holdout_examples: Vec<HoldoutExample>,
    #[serde(default)]
    pub train_rows: usize,
    #[serde(default)]
    pub holdout_rows: usize,
}

#[derive(Debug)]
pub struct TrainOutcome {
    pub model: ClassifierModel,
    pub split: SplitFile,
    pub model_path: PathBuf,
    pub split_path: PathBuf,
}

fn gold_rows<'a>(rows: &[&'a LineRow]) -> Result<Vec<(&'a str, Label)>, ToolingError> {
    rows.iter()
        .map(|row| Ok((row.text.as_str(), row.gold_label()?)))
        .collect()
}

/// Split documents, fit the model on the training side and write both artifacts
pub fn train_classifier(
    data_dir: &Path,
    out_dir: &Path,
    options: &TrainOptions,
) -> Result<TrainOutcome, ToolingError> {
    let rows = load_line_rows(data_dir, &options.filter)?;
    let (train_docs, holdout_docs) = split_docs_for_holdout(
        rows.iter().map(|row| row.doc_id.as_str()),
        options.holdout_ratio,
        &options.split_seed,
    );

    let train_rows: Vec<&LineRow> = rows.iter().filter(|row| train_docs.contains(&row.doc_id)).collect();
    let holdout_rows: Vec<&LineRow> = rows.iter().filter(|row| holdout_docs.contains(&row.doc_id)).collect();
    if train_rows.is_empty() {
        return Err(ToolingError::InvalidDataset("No training rows found after split".to_string()));
    }
    if holdout_rows.is_empty() {
        return Err(ToolingError::InvalidDataset("No holdout rows found after split".to_string()));
    }

    let model = ClassifierModel::train(gold_rows(&train_rows)?, options.alpha, options.max_char_ngram);

    let split = SplitFile {
        holdout_examples: holdout_rows
            .iter()
            .map(|row| HoldoutExample {
                doc_id: row.doc_id.clone(),
                line_index: row.line_index,
            })
            .collect(),
        train_rows: train_rows.len(),
        holdout_rows: holdout_rows.len(),
        train_docs: train_docs.into_iter().collect(),
        holdout_docs: holdout_docs.into_iter().collect(),
    };

    let model_path = out_dir.join(MODEL_FILE);
    let split_path = out_dir.join(SPLIT_FILE);
    model.save(&model_path)?;
    write_json(&split_path, &split)?;

    info!(
        "Train docs: {} | Holdout docs: {} | Train rows: {} | Holdout rows: {}",
        split.train_docs.len(),
        split.holdout_docs.len(),
        split.train_rows,
        split.holdout_rows
    );
    Ok(TrainOutcome {
        model,
        split,
        model_path,
        split_path,
    })
}

/// Label every row with the contextual predictor, one document at a time
pub fn predict_rows(
    predictor: &ContextualPredictor,
    rows: &[LineRow],
) -> Result<Vec<EvaluatedLine>, ToolingError> {
    let mut evaluated = Vec::with_capacity(rows.len());
    for (doc_id, doc_rows) in group_by_doc(rows) {
        let texts: Vec<String> = doc_rows.iter().map(|row| row.text.clone()).collect();
        let labeled = predictor.label_texts(&texts);
        for (row, line) in doc_rows.iter().zip(labeled) {
            evaluated.push(EvaluatedLine {
                doc_id: doc_id.to_string(),
                line_index: row.line_index,
                gold: row.gold_label()?,
                predicted: line.label,
                confidence: line.confidence,
            });
        }
    }
    Ok(evaluated)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationOptions {
    pub filter: DocFilter,
    /// Restricts evaluation to the held-out side of a training split
    pub split: Option<SplitFile>,
    /// Docs with this prefix are always evaluated; empty disables
    pub reserved_prefix: String,
}

fn is_reserved(doc_id: &str, prefix: &str) -> bool {
    !prefix.is_empty() && doc_id.starts_with(prefix)
}

/// Metrics of the runtime predictor over held-out rows
pub fn evaluate_classifier(
    model: Arc<ClassifierModel>,
    data_dir: &Path,
    options: &EvaluationOptions,
) -> Result<Metrics, ToolingError> {
    let mut rows = load_line_rows(data_dir, &options.filter)?;
    let reserved = options.reserved_prefix.as_str();

    let mut evaluation_keys: Option<HashSet<(String, usize)>> = None;
    if let Some(split) = &options.split {
        if split.holdout_examples.is_empty() {
            let holdout: BTreeSet<&str> = split.holdout_docs.iter().map(String::as_str).collect();
            rows.retain(|row| holdout.contains(row.doc_id.as_str()) || is_reserved(&row.doc_id, reserved));
        } else {
            evaluation_keys = Some(
                split
                    .holdout_examples
                    .iter()
                    .map(|example| (example.doc_id.clone(), example.line_index))
                    .collect(),
            );
        }
    }

    if let Some(keys) = &evaluation_keys {
        let docs: HashSet<&str> = keys.iter().map(|(doc_id, _)| doc_id.as_str()).collect();
        rows.retain(|row| docs.contains(row.doc_id.as_str()) || is_reserved(&row.doc_id, reserved));
    }
    if rows.is_empty() {
        return Err(ToolingError::InvalidDataset("No evaluation rows found".to_string()));
    }

    let predictor = ContextualPredictor::new(model);
    let mut predictions = predict_rows(&predictor, &rows)?;
    if let Some(keys) = &evaluation_keys {
        predictions.retain(|line| {
            is_reserved(&line.doc_id, reserved) || keys.contains(&(line.doc_id.clone(), line.line_index))
        });
    }
    if predictions.is_empty() {
        return Err(ToolingError::InvalidDataset("No evaluation rows found".to_string()));
    }

    info!("Evaluating {} predictions", predictions.len());
    Ok(compute_metrics(&predictions))
}
