use super::split_text;
use crate::error::ExtractError;
use crate::model::SourceMetadata;
use crate::source::AcquiredSource;

/// Social captions and pasted recipes: one raw line per text line
pub fn process(text: &str) -> Result<AcquiredSource, ExtractError> {
    let lines = split_text(text, "Recipe text")?;
    Ok(AcquiredSource::new(
        lines,
        SourceMetadata {
            method: Some("text".to_string()),
            ..Default::default()
        },
    ))
}
