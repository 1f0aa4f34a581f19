use crate::error::ExtractError;
use crate::source::{AcquiredSource, RequestFetcher};
use log::info;
use reqwest::Url;

/// Fetch a recipe page and acquire its lines.
///
/// The fetch carries the fetcher's timeout; any transport failure surfaces as
/// [`ExtractError::FetchFailed`] and nothing is classified.
pub async fn process(url: &str, fetcher: &RequestFetcher) -> Result<AcquiredSource, ExtractError> {
    let parsed = Url::parse(url)
        .map_err(|e| ExtractError::InvalidRequest(format!("invalid URL '{url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ExtractError::InvalidRequest(format!(
            "unsupported URL scheme '{}'",
            parsed.scheme()
        )));
    }

    let html = fetcher.fetch(url).await?;
    info!("Fetched {} ({} bytes)", url, html.len());
    super::html::process(&html, Some(url))
}
