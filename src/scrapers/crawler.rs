//! Bounded, relevance-guided recursive site crawl.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, warn};
use url::Url;

use super::extract::extract_page;
use super::http_client::HttpClient;
use super::office_extract::collect_links;
use super::relevance::is_relevant_link;
use crate::error::Result;
use crate::models::{CrawlConfig, CrawlSession};

/// The fetch seam the crawler walks through. Production uses
/// [`HttpClient`]; tests substitute fixture pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        HttpClient::get_text(self, url).await
    }
}

/// Crawl one site from `start_url`, breadth- and depth-bounded, visiting
/// pages strictly one at a time.
///
/// Pages that fail to fetch are logged, stay marked visited (no retry
/// loops), and never abort the walk.
pub async fn crawl_site(
    fetcher: &dyn PageFetcher,
    start_url: &Url,
    config: &CrawlConfig,
) -> CrawlSession {
    let mut session = CrawlSession::new();
    crawl_recursive(fetcher, start_url.clone(), 0, config, &mut session).await;
    debug!(
        "crawl of {} finished: {} pages from {} visited urls",
        start_url,
        session.pages.len(),
        session.visited_count()
    );
    session
}

/// One step of the walk. Budgets are re-evaluated here on every call, so
/// a branch stops mid-way once the page budget runs out, not just at the
/// top of the tree.
fn crawl_recursive<'a>(
    fetcher: &'a dyn PageFetcher,
    url: Url,
    depth: u32,
    config: &'a CrawlConfig,
    session: &'a mut CrawlSession,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if depth > config.max_depth {
            return;
        }
        if session.visited_count() >= config.max_pages {
            return;
        }

        // Fetch the same URL that keys the visited set, so fragments
        // can't smuggle in duplicate fetches.
        let mut url = url;
        url.set_fragment(None);
        if !session.visited.insert(url.to_string()) {
            return;
        }

        let html = match fetcher.get_text(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                // Stays visited: a failing page is a gap, not a retry.
                warn!("fetch failed for {}: {}", url, e);
                return;
            }
        };
        if depth == 0 {
            session.start_html = Some(html.clone());
        }

        // Parse inside a block: the DOM is not Send and must not live
        // across an await point.
        let (record, candidates) = {
            let record = extract_page(&html, &url, depth, config);
            let candidates = relevant_links(&html, &url, config);
            (record, candidates)
        };
        session.pages.push(record);

        for link in candidates {
            if session.visited_count() >= config.max_pages {
                break;
            }
            crawl_recursive(fetcher, link, depth + 1, config, session).await;
        }
    })
}

/// File extensions that are documents, not crawlable pages.
const NON_PAGE_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".doc", ".docx", ".xls", ".xlsx",
];

/// Links worth following from this page: relevance-filtered, resolved,
/// same-origin unless external links are enabled. Document links stay
/// out of the frontier; the extractor already collects them.
fn relevant_links(html: &str, base: &Url, config: &CrawlConfig) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for link in collect_links(&document) {
        let href_lower = link.href.to_lowercase();
        if NON_PAGE_EXTENSIONS.iter().any(|ext| href_lower.ends_with(ext)) {
            continue;
        }
        let relevant = is_relevant_link(&link.text, &link.href)
            || config
                .target_path_fragments
                .iter()
                .any(|fragment| link.href.contains(fragment.as_str()));
        if !relevant {
            continue;
        }

        let resolved = match base.join(&link.href) {
            Ok(u) => u,
            Err(_) => continue,
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if !config.follow_external_links && resolved.origin() != base.origin() {
            continue;
        }
        out.push(resolved);
    }

    out
}

/// Cache/visited key: fragment stripped, everything else intact.
pub fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ScrapeError;

    /// Fixture-backed fetcher that counts requests.
    struct StubFetcher {
        pages: HashMap<String, String>,
        fetches: AtomicUsize,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(url)
                .cloned()
                .ok_or(ScrapeError::Status(404))
        }
    }

    fn config(max_depth: u32, max_pages: usize) -> CrawlConfig {
        CrawlConfig {
            max_depth,
            max_pages,
            ..Default::default()
        }
    }

    fn start() -> Url {
        Url::parse("https://example.gov/").unwrap()
    }

    #[tokio::test]
    async fn single_page_site_yields_one_record() {
        let fetcher = StubFetcher::new(&[(
            "https://example.gov/",
            "<html><title>Permits</title><body><main>Permit info</main></body></html>",
        )]);
        let pages = crawl_site(&fetcher, &start(), &config(2, 10)).await.pages;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Permits");
        assert_eq!(pages[0].depth, 0);
    }

    #[tokio::test]
    async fn follows_relevant_links_only() {
        let fetcher = StubFetcher::new(&[
            (
                "https://example.gov/",
                r#"<a href="/permits">Permit Center</a>
                   <a href="/parks">Parks and Rec</a>"#,
            ),
            ("https://example.gov/permits", "<main>Fees here</main>"),
            ("https://example.gov/parks", "<main>Pools</main>"),
        ]);
        let pages = crawl_site(&fetcher, &start(), &config(2, 10)).await.pages;
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert!(urls.contains(&"https://example.gov/permits"));
        assert!(!urls.contains(&"https://example.gov/parks"));
    }

    #[tokio::test]
    async fn page_budget_bounds_the_walk() {
        // A chain of relevant links longer than the budget.
        let fetcher = StubFetcher::new(&[
            ("https://example.gov/", r#"<a href="/permit/1">permit</a>"#),
            ("https://example.gov/permit/1", r#"<a href="/permit/2">permit</a>"#),
            ("https://example.gov/permit/2", r#"<a href="/permit/3">permit</a>"#),
            ("https://example.gov/permit/3", r#"<a href="/permit/4">permit</a>"#),
        ]);
        let pages = crawl_site(&fetcher, &start(), &config(10, 3)).await.pages;
        assert_eq!(pages.len(), 3);
        assert_eq!(fetcher.fetch_count(), 3);
    }

    #[tokio::test]
    async fn depth_budget_bounds_the_walk() {
        let fetcher = StubFetcher::new(&[
            ("https://example.gov/", r#"<a href="/permit/1">permit</a>"#),
            ("https://example.gov/permit/1", r#"<a href="/permit/2">permit</a>"#),
            ("https://example.gov/permit/2", r#"<a href="/permit/3">permit</a>"#),
        ]);
        let pages = crawl_site(&fetcher, &start(), &config(1, 10)).await.pages;
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.depth <= 1));
    }

    #[tokio::test]
    async fn no_url_is_fetched_twice() {
        // Two pages linking to each other.
        let fetcher = StubFetcher::new(&[
            ("https://example.gov/", r#"<a href="/permit/a">permit</a>"#),
            (
                "https://example.gov/permit/a",
                r#"<a href="/">permit home</a><a href="/permit/a">permit self</a>"#,
            ),
        ]);
        let pages = crawl_site(&fetcher, &start(), &config(5, 10)).await.pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[tokio::test]
    async fn failed_page_is_skipped_not_fatal() {
        let fetcher = StubFetcher::new(&[(
            "https://example.gov/",
            r#"<a href="/permit/missing">permit</a><a href="/permit/ok">permit</a>"#,
        ), (
            "https://example.gov/permit/ok",
            "<main>still reachable</main>",
        )]);
        let pages = crawl_site(&fetcher, &start(), &config(2, 10)).await.pages;
        let urls: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(pages.len(), 2);
        assert!(urls.contains(&"https://example.gov/permit/ok"));
        // The missing page was attempted once, counted, never retried.
        assert_eq!(fetcher.fetch_count(), 3);
    }

    #[tokio::test]
    async fn start_url_fetch_failure_yields_empty() {
        let fetcher = StubFetcher::new(&[]);
        let pages = crawl_site(&fetcher, &start(), &config(2, 10)).await.pages;
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn fragments_do_not_defeat_the_visited_set() {
        let fetcher = StubFetcher::new(&[(
            "https://example.gov/",
            r#"<a href="/permit#fees">permit</a><a href="/permit#hours">permit</a>"#,
        ), (
            "https://example.gov/permit",
            "<main>one page</main>",
        )]);
        let pages = crawl_site(&fetcher, &start(), &config(2, 10)).await.pages;
        assert_eq!(pages.len(), 2);
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn normalize_strips_fragment_only() {
        let url = Url::parse("https://example.gov/a?b=c#frag").unwrap();
        assert_eq!(normalize_url(&url), "https://example.gov/a?b=c");
    }
}
