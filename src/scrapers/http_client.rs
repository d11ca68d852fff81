//! Static fetch strategy: one HTTP request, no script execution.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::error::{Result, ScrapeError};

/// Fixed identifying client signature sent with every request.
pub const USER_AGENT: &str =
    "PermitScout/0.3 (municipal permit data; github.com/permitscout/permitscout)";

/// HTTP client with a bounded timeout and a fixed politeness delay.
///
/// The delay runs after every request, successful or not; it is what
/// keeps a sequential crawl from hammering a single municipal site.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration, request_delay: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            request_delay,
        }
    }

    /// Fetch a page body as text.
    ///
    /// Non-2xx responses map to [`ScrapeError::Status`]; callers treat
    /// any error as "page unavailable" and skip, never abort.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            debug!("GET {} -> {}", url, status);
            tokio::time::sleep(self.request_delay).await;
            return Err(ScrapeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        tokio::time::sleep(self.request_delay).await;
        Ok(body)
    }
}
