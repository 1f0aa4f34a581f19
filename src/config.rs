use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Main pipeline configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    /// Remote page fetching
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Line normalizer limits
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    /// OCR layout reconstruction heuristics
    #[serde(default)]
    pub ocr: OcrConfig,
    /// Classifier training and loading
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Parity gate tolerances
    #[serde(default)]
    pub parity: ParityConfig,
    /// Offline evaluation acceptance thresholds
    #[serde(default)]
    pub thresholds: AcceptanceThresholds,
}

/// Configuration for fetching remote sources
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizerConfig {
    /// Lines beyond this count are dropped
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_lines: default_max_lines(),
        }
    }
}

/// Thresholds for OCR row grouping and column detection.
///
/// These are corpus-tuned defaults; re-validate them against your own fixtures.
#[derive(Debug, Deserialize, Clone)]
pub struct OcrConfig {
    /// Observations below this recognizer confidence are discarded
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Fraction of line height under which two centers share a row
    #[serde(default = "default_row_tolerance")]
    pub row_tolerance: f32,
    /// Minimum gutter width (fraction of page width) for a two-column split
    #[serde(default = "default_min_column_gap")]
    pub min_column_gap: f32,
    /// Each column needs at least this many observations
    #[serde(default = "default_min_column_members")]
    pub min_column_members: usize,
    /// Score lead the column ordering needs to win outright
    #[serde(default = "default_score_margin")]
    pub score_margin: f32,
    /// Score window treated as "comparable"
    #[serde(default = "default_score_tolerance")]
    pub score_tolerance: f32,
    /// Orderings with fewer lines are unusable
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            row_tolerance: default_row_tolerance(),
            min_column_gap: default_min_column_gap(),
            min_column_members: default_min_column_members(),
            score_margin: default_score_margin(),
            score_tolerance: default_score_tolerance(),
            min_lines: default_min_lines(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Exported `line_classifier.json` loaded by the runtime pipeline
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    /// Additive smoothing constant
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Longest character n-gram used as a feature
    #[serde(default = "default_max_char_ngram")]
    pub max_char_ngram: usize,
    /// Share of documents held out for evaluation
    #[serde(default = "default_holdout_ratio")]
    pub holdout_ratio: f64,
    /// Documents whose id starts with this prefix never enter training
    #[serde(default = "default_holdout_prefix")]
    pub holdout_prefix: String,
    /// Mixed into the split hash; empty keeps the historical split
    #[serde(default)]
    pub split_seed: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            alpha: default_alpha(),
            max_char_ngram: default_max_char_ngram(),
            holdout_ratio: default_holdout_ratio(),
            holdout_prefix: default_holdout_prefix(),
            split_seed: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParityConfig {
    /// Maximum tolerated share of lines labeled differently
    #[serde(default = "default_label_mismatch_threshold")]
    pub label_mismatch_threshold: f64,
    /// Maximum documents whose assembled counts may differ
    #[serde(default = "default_max_mismatch_docs")]
    pub max_mismatch_docs: usize,
}

impl Default for ParityConfig {
    fn default() -> Self {
        Self {
            label_mismatch_threshold: default_label_mismatch_threshold(),
            max_mismatch_docs: default_max_mismatch_docs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AcceptanceThresholds {
    #[serde(default = "default_macro_f1")]
    pub macro_f1: f64,
    #[serde(default = "default_note_recall")]
    pub note_recall: f64,
    #[serde(default = "default_ingredient_step_confusion")]
    pub ingredient_step_confusion: f64,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self {
            macro_f1: default_macro_f1(),
            note_recall: default_note_recall(),
            ingredient_step_confusion: default_ingredient_step_confusion(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string()
}

fn default_max_lines() -> usize {
    400
}

fn default_min_confidence() -> f32 {
    0.3
}

fn default_row_tolerance() -> f32 {
    0.65
}

fn default_min_column_gap() -> f32 {
    0.12
}

fn default_min_column_members() -> usize {
    3
}

fn default_score_margin() -> f32 {
    2.0
}

fn default_score_tolerance() -> f32 {
    1.5
}

fn default_min_lines() -> usize {
    2
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_char_ngram() -> usize {
    5
}

fn default_holdout_ratio() -> f64 {
    0.25
}

fn default_holdout_prefix() -> String {
    "holdout_".to_string()
}

fn default_label_mismatch_threshold() -> f64 {
    0.005
}

fn default_max_mismatch_docs() -> usize {
    2
}

fn default_macro_f1() -> f64 {
    0.88
}

fn default_note_recall() -> f64 {
    0.85
}

fn default_ingredient_step_confusion() -> f64 {
    0.08
}

impl PipelineConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_SCHEMA__ prefix
    /// 2. recipe_schema.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_SCHEMA__FETCH__TIMEOUT_SECS
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`PipelineConfig::load`] for precedence rules.
pub fn load_config() -> Result<PipelineConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("recipe_schema").required(false))
        // Use double underscore for nested: RECIPE_SCHEMA__OCR__MIN_CONFIDENCE
        .add_source(
            Environment::with_prefix("RECIPE_SCHEMA")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_timeout(), 20);
        assert_eq!(default_max_lines(), 400);
        assert_eq!(default_holdout_prefix(), "holdout_");
        assert_eq!(default_label_mismatch_threshold(), 0.005);
        assert_eq!(default_max_mismatch_docs(), 2);
    }

    #[test]
    fn test_thresholds_default() {
        let thresholds = AcceptanceThresholds::default();
        assert_eq!(thresholds.macro_f1, 0.88);
        assert_eq!(thresholds.note_recall, 0.85);
        assert_eq!(thresholds.ingredient_step_confusion, 0.08);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings = Config::builder()
            .add_source(File::from_str(
                "[ocr]\nmin_confidence = 0.5\n\n[classifier]\nsplit_seed = \"v2\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: PipelineConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.ocr.min_confidence, 0.5);
        assert_eq!(config.ocr.min_column_members, 3);
        assert_eq!(config.classifier.split_seed, "v2");
        assert_eq!(config.classifier.alpha, 1.0);
        assert_eq!(config.fetch.timeout_secs, 20);
    }

    #[test]
    fn test_load_config_without_file() {
        // Every field has a default, so loading with no file must succeed
        let result = load_config();
        assert!(result.is_ok());
    }
}
