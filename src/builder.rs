use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};

use crate::assembler::assemble_validated;
use crate::classifier::{ClassifierModel, ContextualPredictor};
use crate::config::{load_config, PipelineConfig};
use crate::error::ExtractError;
use crate::model::RecipeDraft;
use crate::normalize::normalize_lines;
use crate::ocr::{GoogleVisionRecognizer, TextRecognizer};
use crate::pipelines;
use crate::source::{AcquiredSource, RequestFetcher};

/// Represents the input source for a recipe
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// Fetch the page at a URL
    Url(String),
    /// Page markup the caller already has
    Html {
        html: String,
        source_url: Option<String>,
    },
    /// Social caption or pasted recipe text
    Text(String),
    /// Text recognized by an external OCR engine
    OcrText(String),
    /// Image file to recognize (Google Vision unless a recognizer is supplied)
    Image(PathBuf),
}

/// Long-lived extraction pipeline.
///
/// Holds the shared read-only classifier model; every call allocates its own lines
/// and draft, so one extractor can serve concurrent requests.
pub struct RecipeExtractor {
    predictor: ContextualPredictor,
    config: PipelineConfig,
    fetcher: RequestFetcher,
    fetch_timeout: Duration,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl RecipeExtractor {
    /// Creates a new builder for extracting recipes
    ///
    /// # Example
    /// ```
    /// use recipe_schema::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder().text("Pancakes\n2 eggs\nWhisk the eggs.");
    /// ```
    pub fn builder() -> RecipeExtractorBuilder {
        RecipeExtractorBuilder::default()
    }

    pub fn new(model: Arc<ClassifierModel>, config: PipelineConfig) -> Result<Self, ExtractError> {
        let fetch_timeout = Duration::from_secs(config.fetch.timeout_secs);
        let fetcher = RequestFetcher::with_timeout(fetch_timeout, &config.fetch.user_agent)?;
        Ok(Self {
            predictor: ContextualPredictor::new(model),
            config,
            fetcher,
            fetch_timeout,
            recognizer: None,
        })
    }

    /// Replace the HTTP client with one using an exact request timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Result<Self, ExtractError> {
        self.fetcher = RequestFetcher::with_timeout(timeout, &self.config.fetch.user_agent)?;
        self.fetch_timeout = timeout;
        Ok(self)
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Acquire, normalize, classify and assemble one source
    pub async fn extract(&self, source: &InputSource) -> Result<RecipeDraft, ExtractError> {
        let acquired = self.acquire(source).await?;
        self.extract_acquired(acquired)
    }

    /// Run the input-specific pipeline only
    pub async fn acquire(&self, source: &InputSource) -> Result<AcquiredSource, ExtractError> {
        match source {
            InputSource::Url(url) => pipelines::url::process(url, &self.fetcher).await,
            InputSource::Html { html, source_url } => {
                pipelines::html::process(html, source_url.as_deref())
            }
            InputSource::Text(text) => pipelines::text::process(text),
            InputSource::OcrText(text) => pipelines::ocr_text::process(text, &self.config.ocr),
            InputSource::Image(path) => {
                let recognizer: Arc<dyn TextRecognizer> = match &self.recognizer {
                    Some(recognizer) => Arc::clone(recognizer),
                    None => Arc::new(GoogleVisionRecognizer::from_env()?),
                };
                pipelines::image::process_file(path, recognizer.as_ref(), &self.config.ocr).await
            }
        }
    }

    /// Normalize, classify and assemble lines that were already acquired
    pub fn extract_acquired(&self, acquired: AcquiredSource) -> Result<RecipeDraft, ExtractError> {
        let lines = normalize_lines(&acquired.lines, self.config.normalizer.max_lines);
        if lines.is_empty() {
            return Err(ExtractError::NoExtractableContent);
        }

        let labeled = self.predictor.label_lines(&lines);
        debug!(
            "Classified {} lines (acquired via {})",
            labeled.len(),
            acquired.metadata.method.as_deref().unwrap_or("unknown")
        );

        let draft = assemble_validated(&labeled, &acquired.metadata)?;
        info!(
            "Extracted '{}': {} ingredients, {} steps",
            draft.title.as_deref().unwrap_or_default(),
            draft.ingredients.len(),
            draft.steps.len()
        );
        Ok(draft)
    }
}

/// Builder for configuring and executing recipe extraction
#[derive(Default)]
pub struct RecipeExtractorBuilder {
    source: Option<InputSource>,
    source_url: Option<String>,
    model: Option<Arc<ClassifierModel>>,
    model_path: Option<PathBuf>,
    config: Option<PipelineConfig>,
    timeout: Option<Duration>,
    recognizer: Option<Arc<dyn TextRecognizer>>,
}

impl RecipeExtractorBuilder {
    /// Set the input source to a URL
    ///
    /// # Example
    /// ```
    /// use recipe_schema::RecipeExtractor;
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://example.com/recipe");
    /// ```
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.source = Some(InputSource::Url(url.into()));
        self
    }

    /// Set the input source to page markup; pair with [`source_url`](Self::source_url)
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.source = Some(InputSource::Html {
            html: html.into(),
            source_url: None,
        });
        self
    }

    /// URL the markup was fetched from, used for image resolution and attribution
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Set the input source to plain text
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.source = Some(InputSource::Text(text.into()));
        self
    }

    /// Set the input source to text recognized by an external OCR engine
    pub fn ocr_text(mut self, text: impl Into<String>) -> Self {
        self.source = Some(InputSource::OcrText(text.into()));
        self
    }

    /// Set the input source to an image file
    ///
    /// Without a [`recognizer`](Self::recognizer) the Google Cloud Vision API is used,
    /// which requires the GOOGLE_API_KEY environment variable.
    pub fn image(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(InputSource::Image(path.into()));
        self
    }

    /// Use an already loaded classifier model
    pub fn model(mut self, model: Arc<ClassifierModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Load the classifier model from an exported `line_classifier.json`
    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Use this configuration instead of `recipe_schema.toml` and the environment
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a timeout for HTTP requests, overriding `fetch.timeout_secs`
    ///
    /// # Example
    /// ```
    /// use recipe_schema::RecipeExtractor;
    /// use std::time::Duration;
    ///
    /// let builder = RecipeExtractor::builder()
    ///     .url("https://example.com/recipe")
    ///     .timeout(Duration::from_secs(30));
    /// ```
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Text recognition backend for image sources
    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Resolve the model and configuration into a reusable extractor
    pub fn extractor(self) -> Result<RecipeExtractor, ExtractError> {
        self.split().map(|(extractor, _)| extractor)
    }

    fn split(self) -> Result<(RecipeExtractor, Option<InputSource>), ExtractError> {
        let config = match self.config {
            Some(config) => config,
            None => load_config()?,
        };

        let model = match (self.model, self.model_path.or_else(|| config.classifier.model_path.clone())) {
            (Some(model), _) => model,
            (None, Some(path)) => {
                debug!("Loading classifier model from {}", path.display());
                Arc::new(
                    ClassifierModel::load(&path)
                        .map_err(|e| ExtractError::ModelUnavailable(e.to_string()))?,
                )
            }
            (None, None) => {
                return Err(ExtractError::ModelUnavailable(
                    "no model supplied; use .model(), .model_path() or classifier.model_path"
                        .to_string(),
                ))
            }
        };

        let mut extractor = RecipeExtractor::new(model, config)?;
        if let Some(timeout) = self.timeout {
            extractor = extractor.with_fetch_timeout(timeout)?;
        }
        if let Some(recognizer) = self.recognizer {
            extractor = extractor.with_recognizer(recognizer);
        }

        let source = match self.source {
            Some(InputSource::Html { html, source_url }) => Some(InputSource::Html {
                html,
                source_url: source_url.or(self.source_url),
            }),
            other => other,
        };
        Ok((extractor, source))
    }

    /// Build the pipeline and extract the configured source
    ///
    /// # Errors
    /// Returns `ExtractError` if:
    /// - No input source was specified, or the input is empty
    /// - No classifier model is available
    /// - The page cannot be fetched
    /// - No acquisition strategy produced any lines
    /// - The assembled draft lacks a title, ingredients or steps
    ///
    /// # Example
    /// ```no_run
    /// # use recipe_schema::RecipeExtractor;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let draft = RecipeExtractor::builder()
    ///     .url("https://example.com/recipe")
    ///     .model_path("artifacts/line_classifier.json")
    ///     .build()
    ///     .await?;
    /// println!("{:?}", draft.title);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(self) -> Result<RecipeDraft, ExtractError> {
        if self.source.is_none() {
            return Err(ExtractError::InvalidRequest(
                "No input source specified. Use .url(), .html(), .text(), .ocr_text() or .image()"
                    .to_string(),
            ));
        }
        let (extractor, source) = self.split()?;
        match source {
            Some(source) => extractor.extract(&source).await,
            None => Err(ExtractError::InvalidRequest("No input source specified".to_string())),
        }
    }
}
