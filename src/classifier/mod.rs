//! Line classifier: n-gram features, rule layer, Naive Bayes model and the
//! document-context pass that turns per-line guesses into final labels.

pub mod export;
pub mod features;
pub mod metrics;
pub mod naive_bayes;
pub mod predictor;
pub mod rules;

pub use export::{export_model, BundleManifest, ExportedBundle};
pub use features::{extract_features, normalize_for_features};
pub use metrics::{all_passed, check_thresholds, compute_metrics, EvaluatedLine, Metrics, ThresholdCheck};
pub use naive_bayes::{ClassifierModel, Prediction};
pub use predictor::ContextualPredictor;
pub use rules::rule_based_label;
