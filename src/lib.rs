//! PermitScout - municipal permit office data acquisition.
//!
//! Turns an arbitrary government website into one structured permit
//! office record: a bounded relevance-guided crawl discovers the
//! relevant pages, extraction produces semantic blocks, a site-type
//! classifier biases field extraction, and static/dynamic/related-page
//! results merge into a [`models::DetailedOfficeInfo`] with a 0-100
//! completeness score. A TTL cache with in-flight deduplication keeps
//! repeated and concurrent lookups from re-crawling the same site.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod scrapers;
pub mod service;

pub use cache::ScrapeCache;
pub use config::Settings;
pub use error::{Result, ScrapeError};
pub use models::DetailedOfficeInfo;
pub use scrapers::PermitScraper;
pub use service::OfficeScrapeService;
