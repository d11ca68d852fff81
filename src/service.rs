//! Process-level scrape service: the engine behind one cache.

use std::sync::Arc;

use crate::cache::ScrapeCache;
use crate::config::Settings;
use crate::models::DetailedOfficeInfo;
use crate::scrapers::PermitScraper;

/// The cache-fronted scraping service.
///
/// Built once by the process entry point and injected into callers;
/// lives for the process lifetime. Every lookup for the same normalized
/// URL shares one pipeline execution and one cache slot.
pub struct OfficeScrapeService {
    scraper: Arc<PermitScraper>,
    cache: ScrapeCache,
}

impl OfficeScrapeService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            scraper: Arc::new(PermitScraper::new(settings)),
            cache: ScrapeCache::new(settings.cache_ttl()),
        }
    }

    /// Cached scrape of one office website.
    ///
    /// `allow_dynamic` overrides the process-wide dynamic toggle for a
    /// pipeline this call starts; a result already cached or in flight
    /// is returned as-is.
    pub async fn get_office_info(
        &self,
        url: &str,
        allow_dynamic: Option<bool>,
    ) -> Option<DetailedOfficeInfo> {
        let scraper = Arc::clone(&self.scraper);
        self.cache
            .get_or_scrape(url, move |normalized| async move {
                scraper
                    .scrape_detailed_office_info(&normalized, allow_dynamic)
                    .await
            })
            .await
    }

    /// The underlying engine, for uncached or requirements-only runs.
    pub fn scraper(&self) -> &PermitScraper {
        &self.scraper
    }

    /// Drop all cached results.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
