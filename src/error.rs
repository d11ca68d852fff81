//! Error types for the scraping pipeline.

use thiserror::Error;

/// Errors produced while fetching or processing a page.
///
/// A `ScrapeError` on a single page never aborts a crawl; callers skip the
/// page and continue. Whole-pipeline failures are caught at the cache
/// boundary and mapped to an empty result.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("browser fetch failed: {0}")]
    Browser(String),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
