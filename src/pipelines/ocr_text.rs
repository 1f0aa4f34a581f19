use super::split_text;
use crate::assembler::patterns::is_ocr_artifact_line;
use crate::config::OcrConfig;
use crate::error::ExtractError;
use crate::model::SourceMetadata;
use crate::source::AcquiredSource;
use log::debug;

/// Text already recognized elsewhere, in reading order.
///
/// Without geometry there is no layout to repair, but a page that is mostly
/// recognition debris is still rejected as unusable.
pub fn process(text: &str, config: &OcrConfig) -> Result<AcquiredSource, ExtractError> {
    let lines = split_text(text, "OCR text")?;

    let present: Vec<&String> = lines.iter().filter(|line| !line.trim().is_empty()).collect();
    let noisy = present
        .iter()
        .filter(|line| is_ocr_artifact_line(line))
        .count();
    let usable = present.len() - noisy;
    debug!("OCR text: {} lines, {} look like debris", present.len(), noisy);

    if usable < config.min_lines || noisy * 2 >= present.len() {
        return Err(ExtractError::OcrUnusable(format!(
            "{usable} usable of {} recognized lines",
            present.len()
        )));
    }

    Ok(AcquiredSource::new(
        lines,
        SourceMetadata {
            method: Some("ocr_text".to_string()),
            ..Default::default()
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_ocr_text() {
        let text = "Tomato Soup\n2 cups tomatoes\nSimmer for 20 minutes\n~";
        let acquired = process(text, &OcrConfig::default()).unwrap();
        assert_eq!(acquired.lines.len(), 4);
        assert_eq!(acquired.metadata.method.as_deref(), Some("ocr_text"));
    }

    #[test]
    fn test_debris_only_is_unusable() {
        let text = "~\n|\nTomato Soup\n--";
        assert!(matches!(
            process(text, &OcrConfig::default()),
            Err(ExtractError::OcrUnusable(_))
        ));
    }
}
