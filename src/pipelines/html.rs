use crate::error::ExtractError;
use crate::source::{acquire_html, source_title_from_url, AcquiredSource};

/// Run the strategy chain (JSON-LD, microdata, visible text) over a page body
pub fn process(html: &str, source_url: Option<&str>) -> Result<AcquiredSource, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::InvalidRequest(
            "HTML document cannot be empty".to_string(),
        ));
    }

    let mut acquired = acquire_html(html, source_url)?;
    if acquired.metadata.source_url.is_none() {
        acquired.metadata.source_url = source_url.map(str::to_string);
    }
    if acquired.metadata.source_title.is_none() {
        acquired.metadata.source_title = source_url.and_then(source_title_from_url);
    }
    Ok(acquired)
}
