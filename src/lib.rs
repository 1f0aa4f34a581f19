//! Turns recipe web pages, social captions, pasted text and OCR output into a
//! structured [`RecipeDraft`].
//!
//! Every input passes the same stages: acquisition into raw lines, normalization,
//! per-line classification against a closed label set, and deterministic assembly.
//! The offline modules ([`dataset`], [`regression`], [`parity`]) train, evaluate and
//! gate the classifier against a fixture corpus.

pub mod assembler;
pub mod builder;
pub mod classifier;
pub mod config;
pub mod dataset;
pub mod duration;
pub mod engine;
pub mod error;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod parity;
pub mod pipelines;
pub mod regression;
pub mod source;

pub use builder::{InputSource, RecipeExtractor, RecipeExtractorBuilder};
pub use classifier::ClassifierModel;
pub use config::PipelineConfig;
pub use error::{ExtractError, ToolingError};
pub use model::{IngredientLine, Label, LabeledLine, Line, RecipeDraft, SourceMetadata};

use std::path::Path;
use std::sync::Arc;

/// Load an exported `line_classifier.json` for sharing across extractions
pub fn load_model(path: impl AsRef<Path>) -> Result<Arc<ClassifierModel>, ExtractError> {
    ClassifierModel::load(path.as_ref())
        .map(Arc::new)
        .map_err(|e| ExtractError::ModelUnavailable(e.to_string()))
}

/// Extract a recipe from a URL with configuration from `recipe_schema.toml` and the environment
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let model = recipe_schema::load_model("artifacts/line_classifier.json")?;
/// let draft = recipe_schema::extract_url("https://example.com/recipe", model).await?;
/// println!("{}", serde_json::to_string_pretty(&draft)?);
/// # Ok(())
/// # }
/// ```
pub async fn extract_url(url: &str, model: Arc<ClassifierModel>) -> Result<RecipeDraft, ExtractError> {
    RecipeExtractor::builder().url(url).model(model).build().await
}

/// Extract a recipe from page markup the caller already fetched
pub async fn extract_html(
    html: &str,
    source_url: Option<&str>,
    model: Arc<ClassifierModel>,
) -> Result<RecipeDraft, ExtractError> {
    let mut builder = RecipeExtractor::builder().html(html).model(model);
    if let Some(url) = source_url {
        builder = builder.source_url(url);
    }
    builder.build().await
}

/// Extract a recipe from a caption or pasted text
pub async fn extract_text(text: &str, model: Arc<ClassifierModel>) -> Result<RecipeDraft, ExtractError> {
    RecipeExtractor::builder().text(text).model(model).build().await
}
