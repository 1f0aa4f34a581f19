//! Multinomial Naive Bayes over sparse n-gram features.
//!
//! The trained model is a plain serializable value. Feature indices are assigned from
//! the sorted vocabulary so two trainings over the same rows produce identical files.

use super::features::{extract_features, feature_total, FeatureCounts};
use super::rules::rule_based_label;
use crate::error::ToolingError;
use crate::model::Label;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

const LABEL_COUNT: usize = Label::ALL.len();

/// Per-label counts gathered while fitting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingCounts {
    pub lines_by_label: BTreeMap<Label, u64>,
    pub features_by_label: BTreeMap<Label, u64>,
    pub vocabulary_size: usize,
}

/// Scored label for one line
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f64,
    /// Probability per label, indexed by [`Label::index`]
    pub probabilities: [f64; LABEL_COUNT],
    /// Whether a deterministic rule decided the label
    pub from_rule: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub labels: Vec<Label>,
    pub alpha: f64,
    pub max_char_ngram: usize,
    pub vocabulary: BTreeMap<String, usize>,
    pub log_priors: Vec<f64>,
    /// `log_likelihoods[label][feature index]`
    pub log_likelihoods: Vec<Vec<f64>>,
    /// Log-likelihood of a feature never seen in training, per label
    pub unseen_log_likelihood: Vec<f64>,
    pub training_counts: TrainingCounts,
}

impl ClassifierModel {
    /// Fit on `(text, label)` rows
    pub fn train<'a, I>(rows: I, alpha: f64, max_char_ngram: usize) -> Self
    where
        I: IntoIterator<Item = (&'a str, Label)>,
    {
        let mut line_counts = [0u64; LABEL_COUNT];
        let mut feature_totals = [0u64; LABEL_COUNT];
        let mut feature_counts: Vec<BTreeMap<String, u64>> = vec![BTreeMap::new(); LABEL_COUNT];
        let mut vocabulary_set = BTreeSet::new();

        for (text, label) in rows {
            let idx = label.index();
            let features = extract_features(text, max_char_ngram);
            line_counts[idx] += 1;
            feature_totals[idx] += feature_total(&features);
            for (feature, count) in features {
                *feature_counts[idx].entry(feature.clone()).or_insert(0) += u64::from(count);
                vocabulary_set.insert(feature);
            }
        }

        let vocabulary: BTreeMap<String, usize> = vocabulary_set
            .into_iter()
            .enumerate()
            .map(|(index, feature)| (feature, index))
            .collect();
        let vocab_size = vocabulary.len().max(1) as f64;
        let total_lines: u64 = line_counts.iter().sum();

        let log_priors = Label::ALL
            .iter()
            .map(|label| {
                if total_lines == 0 {
                    -1e9
                } else {
                    ((line_counts[label.index()] as f64 + alpha)
                        / (total_lines as f64 + alpha * LABEL_COUNT as f64))
                        .ln()
                }
            })
            .collect();

        let mut log_likelihoods = Vec::with_capacity(LABEL_COUNT);
        let mut unseen_log_likelihood = Vec::with_capacity(LABEL_COUNT);
        for label in Label::ALL {
            let idx = label.index();
            let denominator = feature_totals[idx] as f64 + alpha * vocab_size;
            let row: Vec<f64> = vocabulary
                .keys()
                .map(|feature| {
                    let count = feature_counts[idx].get(feature).copied().unwrap_or(0);
                    ((count as f64 + alpha) / denominator).ln()
                })
                .collect();
            log_likelihoods.push(row);
            unseen_log_likelihood.push((alpha / denominator).ln());
        }

        let training_counts = TrainingCounts {
            lines_by_label: Label::ALL
                .iter()
                .map(|label| (*label, line_counts[label.index()]))
                .collect(),
            features_by_label: Label::ALL
                .iter()
                .map(|label| (*label, feature_totals[label.index()]))
                .collect(),
            vocabulary_size: vocabulary.len(),
        };

        info!(
            "Trained classifier on {} lines, vocabulary size {}",
            total_lines,
            vocabulary.len()
        );

        Self {
            labels: Label::ALL.to_vec(),
            alpha,
            max_char_ngram,
            vocabulary,
            log_priors,
            log_likelihoods,
            unseen_log_likelihood,
            training_counts,
        }
    }

    /// Rule label when one applies, otherwise the Naive Bayes arg-max
    pub fn predict(&self, text: &str) -> Prediction {
        if let Some((label, confidence)) = rule_based_label(text) {
            let spread = (1.0 - confidence).max(0.0) / (LABEL_COUNT - 1) as f64;
            let mut probabilities = [spread; LABEL_COUNT];
            probabilities[label.index()] = confidence;
            return Prediction {
                label,
                confidence,
                probabilities,
                from_rule: true,
            };
        }

        let features = extract_features(text, self.max_char_ngram);
        let scores = self.log_scores(&features);

        let mut best = 0;
        for idx in 1..LABEL_COUNT {
            if scores[idx] > scores[best] {
                best = idx;
            }
        }

        let max_score = scores[best];
        let mut probabilities = [0.0; LABEL_COUNT];
        for (idx, score) in scores.iter().enumerate() {
            probabilities[idx] = (score - max_score).exp();
        }
        let normalizer: f64 = probabilities.iter().sum();
        let normalizer = if normalizer > 0.0 { normalizer } else { 1.0 };
        for probability in &mut probabilities {
            *probability /= normalizer;
        }

        Prediction {
            label: Label::ALL[best],
            confidence: probabilities[best],
            probabilities,
            from_rule: false,
        }
    }

    /// `log-prior + Σ count × log-likelihood` per label
    fn log_scores(&self, features: &FeatureCounts) -> [f64; LABEL_COUNT] {
        let mut scores = [0.0; LABEL_COUNT];
        for (idx, score) in scores.iter_mut().enumerate() {
            let likelihoods = &self.log_likelihoods[idx];
            let unseen = self.unseen_log_likelihood[idx];
            let sum: f64 = features
                .iter()
                .map(|(feature, &count)| {
                    let log_likelihood = self
                        .vocabulary
                        .get(feature)
                        .map_or(unseen, |&feature_idx| likelihoods[feature_idx]);
                    f64::from(count) * log_likelihood
                })
                .sum();
            *score = self.log_priors[idx] + sum;
        }
        scores
    }

    /// Structural checks run after deserializing a model file
    pub fn validate(&self) -> Result<(), String> {
        if self.labels != Label::ALL {
            return Err(format!("unexpected label order {:?}", self.labels));
        }
        if self.log_priors.len() != LABEL_COUNT
            || self.log_likelihoods.len() != LABEL_COUNT
            || self.unseen_log_likelihood.len() != LABEL_COUNT
        {
            return Err("per-label tables must have one entry per label".to_string());
        }
        let vocab_size = self.vocabulary.len();
        if self.log_likelihoods.iter().any(|row| row.len() != vocab_size) {
            return Err(format!(
                "log-likelihood rows must match vocabulary size {vocab_size}"
            ));
        }
        if self.vocabulary.values().any(|&index| index >= vocab_size) {
            return Err("vocabulary index out of range".to_string());
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ToolingError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ToolingError::io(parent, e))?;
        }
        let payload = serde_json::to_string(self).map_err(|e| ToolingError::json(path, e))?;
        fs::write(path, payload + "\n").map_err(|e| ToolingError::io(path, e))?;
        debug!("Saved classifier model to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ToolingError> {
        let raw = fs::read_to_string(path).map_err(|e| ToolingError::io(path, e))?;
        let model: Self = serde_json::from_str(&raw).map_err(|e| ToolingError::json(path, e))?;
        model.validate().map_err(|reason| {
            ToolingError::InvalidDataset(format!("{}: {}", path.display(), reason))
        })?;
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn toy_rows() -> Vec<(&'static str, Label)> {
        vec![
            ("Garlic Butter Shrimp", Label::Title),
            ("fresh basil", Label::Ingredient),
            ("kosher salt", Label::Ingredient),
            ("parsley leaves", Label::Ingredient),
            ("gently fold everything together", Label::Step),
            ("keep stirring until thick", Label::Step),
            ("this freezes well for a month", Label::Note),
            ("Ingredients", Label::Header),
            ("advertisement", Label::Junk),
        ]
    }

    fn toy_model() -> ClassifierModel {
        ClassifierModel::train(toy_rows(), 1.0, 5)
    }

    #[test]
    fn test_train_builds_consistent_tables() {
        let model = toy_model();
        assert!(model.validate().is_ok());
        assert_eq!(model.training_counts.lines_by_label[&Label::Ingredient], 3);
        assert_eq!(model.training_counts.vocabulary_size, model.vocabulary.len());
        let prior_sum: f64 = model.log_priors.iter().map(|p| p.exp()).sum();
        assert!((prior_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_uses_learned_features() {
        let model = toy_model();
        let prediction = model.predict("basil");
        assert!(!prediction.from_rule);
        assert_eq!(prediction.label, Label::Ingredient);
        let total: f64 = prediction.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(prediction.confidence > 0.0 && prediction.confidence <= 1.0);
    }

    #[test]
    fn test_rules_answer_first() {
        let model = toy_model();
        let prediction = model.predict("2 cups flour");
        assert!(prediction.from_rule);
        assert_eq!(prediction.label, Label::Ingredient);
        assert_eq!(prediction.confidence, 0.95);
        assert!((prediction.probabilities[Label::Step.index()] - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_unseen_features_never_fail() {
        let model = toy_model();
        let prediction = model.predict("zzqx qqqv");
        assert!(Label::ALL.contains(&prediction.label));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model").join("line_classifier.json");
        let model = toy_model();
        model.save(&path).unwrap();
        let loaded = ClassifierModel::load(&path).unwrap();
        assert_eq!(loaded.vocabulary, model.vocabulary);
        assert_eq!(loaded.predict("basil").label, model.predict("basil").label);
    }

    #[test]
    fn test_load_rejects_inconsistent_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        let mut model = toy_model();
        model.log_priors.pop();
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();
        assert!(matches!(
            ClassifierModel::load(&path),
            Err(ToolingError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_training_is_deterministic() {
        assert_eq!(toy_model(), toy_model());
    }
}
