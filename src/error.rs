use thiserror::Error;

/// Errors that can surface from a recipe extraction call
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Remote page could not be fetched (timeout, transport, non-2xx, undecodable body)
    #[error("Failed to fetch source: {0}")]
    FetchFailed(String),

    /// No acquisition strategy produced any text lines
    #[error("No extractable content found in source")]
    NoExtractableContent,

    /// OCR observations were too few or too noisy in every candidate ordering
    #[error("OCR output is unusable: {0}")]
    OcrUnusable(String),

    /// Assembly ran but the draft lacks a title, ingredients or steps
    #[error("Insufficient recipe structure (missing: {})", .missing.join(", "))]
    InsufficientStructure { missing: Vec<&'static str> },

    /// The request itself is malformed (empty text, missing source, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No classifier model was supplied or it could not be loaded
    #[error("Classifier model unavailable: {0}")]
    ModelUnavailable(String),

    /// Text recognition backend failed
    #[error("Text recognition failed: {0}")]
    Recognizer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<reqwest::Error> for ExtractError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExtractError::FetchFailed(format!("request timed out: {err}"))
        } else {
            ExtractError::FetchFailed(err.to_string())
        }
    }
}

/// Errors raised by the offline dataset, training and parity tooling
#[derive(Error, Debug)]
pub enum ToolingError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("External implementation failed: {0}")]
    Bridge(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

impl ToolingError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ToolingError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn json(path: impl AsRef<std::path::Path>, source: serde_json::Error) -> Self {
        ToolingError::Json {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
