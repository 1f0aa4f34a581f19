use crate::config::OcrConfig;
use crate::error::ExtractError;
use crate::model::SourceMetadata;
use crate::ocr::{reconstruct, LayoutChoice, TextRecognizer};
use crate::source::AcquiredSource;
use log::info;
use std::path::Path;

/// Recognize a photographed recipe and rebuild its reading order
pub async fn process(
    image: &[u8],
    recognizer: &dyn TextRecognizer,
    config: &OcrConfig,
) -> Result<AcquiredSource, ExtractError> {
    if image.is_empty() {
        return Err(ExtractError::InvalidRequest("image is empty".to_string()));
    }

    let observations = recognizer.recognize(image).await?;
    let layout = reconstruct(&observations, config)?;
    info!(
        "OCR: {} observations became {} lines ({})",
        observations.len(),
        layout.lines.len(),
        match layout.choice {
            LayoutChoice::SinglePass => "single pass",
            LayoutChoice::TwoColumn => "two columns",
        }
    );

    Ok(AcquiredSource::new(
        layout.lines.into_iter().map(|line| line.text).collect(),
        SourceMetadata {
            method: Some("ocr_layout".to_string()),
            ..Default::default()
        },
    ))
}

/// [`process`] over an image file on disk
pub async fn process_file(
    path: &Path,
    recognizer: &dyn TextRecognizer,
    config: &OcrConfig,
) -> Result<AcquiredSource, ExtractError> {
    let image = tokio::fs::read(path).await.map_err(|e| {
        ExtractError::InvalidRequest(format!("failed to read image {}: {e}", path.display()))
    })?;
    process(&image, recognizer, config).await
}
