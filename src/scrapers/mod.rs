//! The permit office scraping pipeline.
//!
//! One top-level scrape runs: bounded crawl -> requirements
//! aggregation -> static profile -> optional dynamic profile ->
//! related-pages sweep -> cross-strategy merge -> completeness score.
//! Pages inside a crawl are visited strictly sequentially; concurrency
//! only exists across scrapes of different sites.

pub mod aggregate;
pub mod browser;
pub mod crawler;
pub mod extract;
pub mod http_client;
pub mod merge;
pub mod office_extract;
pub mod patterns;
pub mod quality;
pub mod relevance;

use chrono::Utc;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

pub use browser::{BrowserFetcher, RenderedPage};
pub use crawler::{crawl_site, normalize_url, PageFetcher};
pub use http_client::{HttpClient, USER_AGENT};

use crate::config::Settings;
use crate::models::{
    CrawlConfig, DetailedOfficeInfo, PermitRequirements, Reliability, ScrapingMethod,
};

/// The scraping engine. Construct once and share; every method is safe
/// to call from concurrent tasks.
pub struct PermitScraper {
    client: HttpClient,
    browser: BrowserFetcher,
    settings: Settings,
}

impl PermitScraper {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: HttpClient::new(settings.fetch_timeout(), settings.request_delay()),
            browser: BrowserFetcher::new(settings.fetch_timeout()),
            settings: settings.clone(),
        }
    }

    fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            max_depth: self.settings.max_depth,
            max_pages: self.settings.max_pages,
            ..Default::default()
        }
    }

    /// Scrape one office website into a merged record.
    ///
    /// `allow_dynamic` overrides the process-wide toggle for this call.
    /// Returns `None` on unrecoverable failure (unparseable URL, start
    /// page unreachable); downstream treats that as "no data
    /// available".
    pub async fn scrape_detailed_office_info(
        &self,
        url: &str,
        allow_dynamic: Option<bool>,
    ) -> Option<DetailedOfficeInfo> {
        let start_url = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                warn!("refusing to scrape unparseable url {}: {}", url, e);
                return None;
            }
        };

        info!("scrape started for {}", start_url);

        // 1. Bounded relevance-guided crawl.
        let session = crawl_site(&self.client, &start_url, &self.crawl_config()).await;
        if session.pages.is_empty() {
            // The start page itself was unreachable.
            return None;
        }

        // 2. Fold every crawled page into the requirements roll-up.
        let mut requirements = aggregate::aggregate_requirements(&session.pages);

        // 3. Static profile from the start page, biased by site type.
        let start_page = &session.pages[0];
        let pattern = patterns::classify(
            start_url.as_str(),
            &start_page.title,
            &start_page.main_text,
        );
        let mut static_info = match &session.start_html {
            Some(html) => {
                let document = Html::parse_document(html);
                office_extract::profile_from_document(&document, &start_url, pattern)
            }
            None => DetailedOfficeInfo::default(),
        };
        backfill_from_requirements(&mut static_info, &requirements);

        // 4. Dynamic profile, if enabled and a browser exists.
        let run_dynamic = allow_dynamic.unwrap_or(self.settings.enable_dynamic);
        let dynamic_info = if run_dynamic && BrowserFetcher::available() {
            match self.browser.fetch_rendered(start_url.as_str()).await {
                Ok(rendered) if !rendered.is_empty() => {
                    for table in &rendered.tables {
                        requirements.fees.extend(aggregate::fees_from_table(table));
                    }
                    Some(office_extract::profile_from_text(
                        &rendered.text,
                        &rendered.links(),
                        &start_url,
                    ))
                }
                Ok(_) => None,
                Err(e) => {
                    warn!("dynamic pass failed for {}: {}", start_url, e);
                    None
                }
            }
        } else {
            if run_dynamic {
                browser::log_dynamic_fallback_once();
            }
            None
        };

        // 5. Probe common government paths for extra forms and contacts.
        let related_info = merge::scrape_related_pages(&self.client, &start_url).await;

        // 6. Merge with explicit precedence, then score.
        static_info.requirements = requirements;
        let mut merged = merge::merge_office_info(static_info, dynamic_info, Some(related_info));

        if merged.metadata.scraping_method == ScrapingMethod::Static
            && session.pages.len() == 1
            && session.pages[0].quality_score < 0.3
        {
            merged.metadata.source_reliability = Reliability::Low;
        }

        merged.metadata.data_completeness = quality::completeness(&merged);
        merged.metadata.last_scraped = Utc::now();

        info!(
            "scrape completed for {}: completeness {}%",
            start_url, merged.metadata.data_completeness
        );
        Some(merged)
    }

    /// Crawl a site and return only the requirements roll-up.
    pub async fn scrape_requirements(&self, url: &str) -> Option<PermitRequirements> {
        let start_url = Url::parse(url).ok()?;
        let session = crawl_site(&self.client, &start_url, &self.crawl_config()).await;
        if session.pages.is_empty() {
            return None;
        }
        debug!("aggregating requirements from {} pages", session.pages.len());
        Some(aggregate::aggregate_requirements(&session.pages))
    }
}

/// Let crawl-level findings fill profile gaps the start page left:
/// aggregated contacts supply a missing phone/email, classified lists
/// supply missing process steps and checklist.
fn backfill_from_requirements(info: &mut DetailedOfficeInfo, req: &PermitRequirements) {
    if info.phone.is_empty() {
        if let Some(phone) = req.contacts.iter().find_map(|c| c.phone.clone()) {
            info.phone = phone;
        }
    }
    if info.email.is_empty() {
        if let Some(email) = req.contacts.iter().find_map(|c| c.email.clone()) {
            info.email = email;
        }
    }
    if info.process_info.permit_process_steps.is_none() && !req.step_by_step.is_empty() {
        info.process_info.permit_process_steps = Some(req.step_by_step.clone());
    }
    if info.process_info.requirements_checklist.is_none() && !req.required_documents.is_empty() {
        info.process_info.requirements_checklist = Some(req.required_documents.clone());
    }
    if info.process_info.typical_processing_time.is_none() {
        if let Some(timeline) = req.timelines.first() {
            info.process_info.typical_processing_time = Some(timeline.description.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Contact;

    #[test]
    fn backfill_fills_only_gaps() {
        let mut info = DetailedOfficeInfo {
            phone: "(404) 555-0001".into(),
            ..Default::default()
        };
        let req = PermitRequirements {
            contacts: vec![Contact {
                phone: Some("(404) 555-9999".into()),
                email: Some("clerk@example.gov".into()),
                ..Default::default()
            }],
            step_by_step: vec!["Step 1: Apply".into()],
            ..Default::default()
        };

        backfill_from_requirements(&mut info, &req);
        assert_eq!(info.phone, "(404) 555-0001");
        assert_eq!(info.email, "clerk@example.gov");
        assert_eq!(
            info.process_info.permit_process_steps.as_deref(),
            Some(&["Step 1: Apply".to_string()][..])
        );
    }
}
