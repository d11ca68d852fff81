//! TTL result cache with in-flight request coalescing.
//!
//! One instance wraps the whole pipeline per normalized URL. The
//! ordering inside [`ScrapeCache::get_or_scrape`] (check cache, then
//! in-flight, then register) happens under a single lock, which is the
//! invariant that bounds concurrent load to one pipeline per URL no
//! matter how many callers ask at once.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;
use url::Url;

use crate::models::DetailedOfficeInfo;

/// Cache entries beyond this count trigger an expiry sweep on insert.
const PRUNE_THRESHOLD: usize = 100;

type ScrapeResult = Option<DetailedOfficeInfo>;
type SharedScrape = Shared<BoxFuture<'static, ScrapeResult>>;

/// A cached outcome. Negative results (`None`) are cached too, so a
/// consistently failing site is not hammered.
struct CacheEntry {
    value: ScrapeResult,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: ScrapeResult, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    inflight: HashMap<String, SharedScrape>,
}

/// Per-URL result cache and in-flight deduplicator.
///
/// Constructed once at process start and injected wherever scraping is
/// requested; entries expire independently by TTL and are replaced
/// wholesale, never partially mutated.
pub struct ScrapeCache {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl ScrapeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                inflight: HashMap::new(),
            })),
            ttl,
        }
    }

    /// Cache key: the URL with its fragment stripped. Unparseable input
    /// is keyed verbatim; the pipeline will reject it anyway.
    pub fn normalize_key(url: &str) -> String {
        match Url::parse(url) {
            Ok(mut u) => {
                u.set_fragment(None);
                u.to_string()
            }
            Err(_) => url.to_string(),
        }
    }

    /// Serve from cache, join an in-flight pipeline, or start one.
    ///
    /// `pipeline` receives the normalized URL and runs at most once per
    /// key concurrently. Its outcome, including `None`, lands in the
    /// cache for the full TTL, and the in-flight entry is removed
    /// unconditionally when it completes.
    pub async fn get_or_scrape<F, Fut>(&self, url: &str, pipeline: F) -> ScrapeResult
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ScrapeResult> + Send + 'static,
    {
        let key = Self::normalize_key(url);

        let shared = {
            let mut guard = self.inner.lock().expect("cache lock poisoned");

            if let Some(entry) = guard.entries.get(&key) {
                if !entry.is_expired() {
                    debug!("cache hit for {}", key);
                    return entry.value.clone();
                }
            }

            if let Some(existing) = guard.inflight.get(&key) {
                debug!("joining in-flight scrape for {}", key);
                existing.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let ttl = self.ttl;
                let completion_key = key.clone();
                let work = pipeline(key.clone());

                let shared: SharedScrape = async move {
                    let result = work.await;
                    let mut guard = inner.lock().expect("cache lock poisoned");
                    guard.inflight.remove(&completion_key);
                    guard
                        .entries
                        .insert(completion_key, CacheEntry::new(result.clone(), ttl));
                    if guard.entries.len() > PRUNE_THRESHOLD {
                        guard.entries.retain(|_, entry| !entry.is_expired());
                    }
                    result
                }
                .boxed()
                .shared();

                guard.inflight.insert(key, shared.clone());
                shared
            }
        };

        shared.await
    }

    /// Drop every cached entry. In-flight pipelines finish and recache.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.entries.clear();
        }
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|guard| guard.entries.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn record(name: &str) -> DetailedOfficeInfo {
        DetailedOfficeInfo {
            office_name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn concurrent_requests_run_one_pipeline() {
        let cache = ScrapeCache::new(Duration::from_secs(60));
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = |runs: Arc<AtomicUsize>| {
            move |_url: String| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Some(record("Office"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_scrape("https://example.gov/", pipeline(Arc::clone(&runs))),
            cache.get_or_scrape("https://example.gov/", pipeline(Arc::clone(&runs))),
        );

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(a.unwrap().office_name, "Office");
        assert_eq!(b.unwrap().office_name, "Office");
    }

    #[tokio::test]
    async fn cached_result_served_until_ttl() {
        let cache = ScrapeCache::new(Duration::from_millis(40));
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = |runs: Arc<AtomicUsize>| {
            move |_url: String| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Some(record("Office"))
            }
        };

        let first = cache
            .get_or_scrape("https://example.gov/", pipeline(Arc::clone(&runs)))
            .await;
        let second = cache
            .get_or_scrape("https://example.gov/", pipeline(Arc::clone(&runs)))
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(
            first.unwrap().office_name,
            second.unwrap().office_name
        );

        tokio::time::sleep(Duration::from_millis(60)).await;

        cache
            .get_or_scrape("https://example.gov/", pipeline(Arc::clone(&runs)))
            .await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn negative_results_are_cached() {
        let cache = ScrapeCache::new(Duration::from_secs(60));
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = |runs: Arc<AtomicUsize>| {
            move |_url: String| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                None
            }
        };

        let first = cache
            .get_or_scrape("https://down.example.gov/", pipeline(Arc::clone(&runs)))
            .await;
        let second = cache
            .get_or_scrape("https://down.example.gov/", pipeline(Arc::clone(&runs)))
            .await;

        assert!(first.is_none());
        assert!(second.is_none());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn fragments_share_one_key() {
        let cache = ScrapeCache::new(Duration::from_secs(60));
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = |runs: Arc<AtomicUsize>| {
            move |_url: String| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Some(record("Office"))
            }
        };

        cache
            .get_or_scrape("https://example.gov/page#fees", pipeline(Arc::clone(&runs)))
            .await;
        cache
            .get_or_scrape("https://example.gov/page#hours", pipeline(Arc::clone(&runs)))
            .await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_urls_do_not_coalesce() {
        let cache = ScrapeCache::new(Duration::from_secs(60));
        let runs = Arc::new(AtomicUsize::new(0));

        let pipeline = |runs: Arc<AtomicUsize>| {
            move |_url: String| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Some(record("Office"))
            }
        };

        let (_, _) = tokio::join!(
            cache.get_or_scrape("https://a.example.gov/", pipeline(Arc::clone(&runs))),
            cache.get_or_scrape("https://b.example.gov/", pipeline(Arc::clone(&runs))),
        );

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pipeline_receives_normalized_url() {
        let cache = ScrapeCache::new(Duration::from_secs(60));
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_clone = Arc::clone(&seen);

        cache
            .get_or_scrape("https://example.gov/page#frag", move |url| async move {
                *seen_clone.lock().unwrap() = url;
                None
            })
            .await;

        assert_eq!(&*seen.lock().unwrap(), "https://example.gov/page");
    }

    #[test]
    fn normalize_strips_fragment_only() {
        assert_eq!(
            ScrapeCache::normalize_key("https://example.gov/a?b=c#frag"),
            "https://example.gov/a?b=c"
        );
        assert_eq!(ScrapeCache::normalize_key("not a url"), "not a url");
    }
}
