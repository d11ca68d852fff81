//! Runtime configuration for the scraping engine.
//!
//! Settings come from defaults, an optional TOML file, and environment
//! variables (highest precedence). A `.env` file is honored when present.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default cache TTL for scrape results (30 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default delay between requests to the same site.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Default crawl budgets: depth 4, 15 pages per site.
pub const DEFAULT_MAX_DEPTH: u32 = 4;
pub const DEFAULT_MAX_PAGES: usize = 15;

/// Process-wide scraper settings.
///
/// Constructed once at startup and passed by reference into the services
/// that need it. Crawl budgets here are the per-invocation defaults; a
/// caller may still build a custom [`crate::models::CrawlConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enable the headless-browser fetch strategy. Even when true, the
    /// dynamic pass silently degrades to static-only if no browser
    /// capability is present.
    pub enable_dynamic: bool,

    /// TTL for cached scrape results, in seconds.
    pub cache_ttl_secs: u64,

    /// Per-fetch timeout, in seconds.
    pub fetch_timeout_secs: u64,

    /// Politeness delay applied after every outbound request, in ms.
    pub request_delay_ms: u64,

    /// Maximum recursion depth for the site crawl.
    pub max_depth: u32,

    /// Maximum pages fetched per crawl invocation.
    pub max_pages: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_dynamic: false,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Self {
        let mut settings = path
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|text| toml::from_str::<Settings>(&text).ok())
            .unwrap_or_default();
        settings.apply_env();
        settings
    }

    /// Apply `PERMITSCOUT_*` environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_bool("PERMITSCOUT_ENABLE_DYNAMIC") {
            self.enable_dynamic = v;
        }
        if let Some(v) = env_parse("PERMITSCOUT_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse("PERMITSCOUT_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_parse("PERMITSCOUT_REQUEST_DELAY_MS") {
            self.request_delay_ms = v;
        }
        if let Some(v) = env_parse("PERMITSCOUT_MAX_DEPTH") {
            self.max_depth = v;
        }
        if let Some(v) = env_parse::<usize>("PERMITSCOUT_MAX_PAGES") {
            self.max_pages = v.max(1);
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.trim().parse().ok()
}
