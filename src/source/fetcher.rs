use crate::config::FetchConfig;
use crate::error::ExtractError;
use log::debug;
use reqwest::Client;
use std::time::Duration;

/// Plain HTTP fetcher; the only suspending step on the extraction path
pub struct RequestFetcher {
    client: Client,
}

impl RequestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, ExtractError> {
        Self::with_timeout(Duration::from_secs(config.timeout_secs), &config.user_agent)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ExtractError::FetchFailed(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch a page body. Non-2xx responses, timeouts and non-UTF-8 bodies are failures.
    pub async fn fetch(&self, url: &str) -> Result<String, ExtractError> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::FetchFailed(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }

        let bytes = response.bytes().await?;
        debug!("Fetched {} bytes from {}", bytes.len(), url);
        String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::FetchFailed(format!("response from {url} is not valid UTF-8")))
    }
}
