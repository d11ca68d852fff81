//! Dynamic fetch strategy: a headless browser renders the page before
//! extraction.
//!
//! The capability is optional twice over: the `browser` cargo feature
//! gates the chromiumoxide dependency, and at runtime a Chrome
//! executable may simply not exist. Either way the pipeline degrades to
//! static-only; absence is a normal branch, never an error.

use std::sync::Once;

use serde::Deserialize;
use tracing::warn;

use super::office_extract::LinkInfo;
use crate::error::Result;
use crate::models::{FormDescriptor, TableRecord};

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::sync::OnceLock;
#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tracing::debug;

#[cfg(feature = "browser")]
use crate::error::ScrapeError;

/// Extra wait after document-ready for late-running scripts.
#[cfg(feature = "browser")]
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// An anchor as seen in the rendered DOM, with surrounding text for
/// categorization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderedAnchor {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub context: String,
}

/// Everything harvested from a rendered page.
///
/// An empty value (the `Default`) is the degraded-mode result when no
/// browser capability exists.
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub final_url: String,
    /// Full rendered text of the document body.
    pub text: String,
    pub anchors: Vec<RenderedAnchor>,
    pub forms: Vec<FormDescriptor>,
    pub tables: Vec<TableRecord>,
}

impl RenderedPage {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.anchors.is_empty()
    }

    /// Anchors as plain links for the shared categorizers.
    pub fn links(&self) -> Vec<LinkInfo> {
        self.anchors
            .iter()
            .map(|a| LinkInfo {
                href: a.href.clone(),
                text: a.text.clone(),
                title: a.title.clone(),
            })
            .collect()
    }
}

/// Log the static-only fallback once per process, not once per call.
/// A disabled browser on a busy service would otherwise flood the log.
pub fn log_dynamic_fallback_once() {
    static LOGGED: Once = Once::new();
    LOGGED.call_once(|| {
        warn!("dynamic rendering unavailable; continuing with static fetches only");
    });
}

/// Browser-backed fetcher. Launches an isolated browser per fetch and
/// tears it down afterwards; permit scrapes are too infrequent to be
/// worth keeping a browser process warm.
#[cfg(feature = "browser")]
pub struct BrowserFetcher {
    timeout: Duration,
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Whether a Chrome executable exists. Resolved once and cached for
    /// the life of the process.
    pub fn available() -> bool {
        Self::chrome_path().is_some()
    }

    fn chrome_path() -> Option<&'static PathBuf> {
        static CHROME: OnceLock<Option<PathBuf>> = OnceLock::new();
        CHROME
            .get_or_init(|| {
                for path in Self::CHROME_PATHS {
                    let p = std::path::Path::new(path);
                    if p.exists() {
                        debug!("found Chrome at {}", path);
                        return Some(p.to_path_buf());
                    }
                }
                for cmd in &[
                    "google-chrome",
                    "google-chrome-stable",
                    "chromium",
                    "chromium-browser",
                ] {
                    if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                        if output.status.success() {
                            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                            if !path.is_empty() {
                                debug!("found Chrome in PATH: {}", path);
                                return Some(PathBuf::from(path));
                            }
                        }
                    }
                }
                None
            })
            .as_ref()
    }

    /// Navigate, wait for the document to settle, and read the rendered
    /// DOM: text, anchors with context, forms, tables.
    pub async fn fetch_rendered(&self, url: &str) -> Result<RenderedPage> {
        let chrome = Self::chrome_path()
            .ok_or_else(|| ScrapeError::Browser("no Chrome executable".to_string()))?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome.clone())
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(ScrapeError::Browser)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.render(&browser, url).await;

        let _ = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();

        result
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<RenderedPage> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        page.goto(url)
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        // Bounded wait for network idle; a stuck page is not fatal, the
        // DOM as-is still gets read.
        if tokio::time::timeout(self.timeout, page.wait_for_navigation())
            .await
            .is_err()
        {
            debug!("navigation wait timed out for {}", url);
        }
        tokio::time::sleep(SETTLE_DELAY).await;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;

        let text: String = page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .ok()
            .and_then(|v| v.into_value().ok())
            .unwrap_or_default();

        let anchors: Vec<RenderedAnchor> = page
            .evaluate(ANCHOR_HARVEST_SCRIPT)
            .await
            .ok()
            .and_then(|v| v.into_value().ok())
            .unwrap_or_default();

        let _ = page.close().await;

        // Forms and tables come from the rendered markup through the
        // same extractor the static pass uses.
        let (forms, tables) = {
            let document = scraper::Html::parse_document(&html);
            (
                super::extract::extract_forms(&document),
                super::extract::extract_tables(&document),
            )
        };

        Ok(RenderedPage {
            final_url,
            text,
            anchors,
            forms,
            tables,
        })
    }
}

#[cfg(feature = "browser")]
const ANCHOR_HARVEST_SCRIPT: &str = r#"
Array.from(document.querySelectorAll('a')).map(a => ({
    href: a.getAttribute('href') || '',
    text: (a.textContent || '').trim(),
    title: a.getAttribute('title') || '',
    context: a.parentElement && a.parentElement.textContent
        ? a.parentElement.textContent.trim().slice(0, 200)
        : ''
}))
"#;

// Stub for builds without the browser feature: the capability is simply
// never available.
#[cfg(not(feature = "browser"))]
pub struct BrowserFetcher;

#[cfg(not(feature = "browser"))]
impl BrowserFetcher {
    pub fn new(_timeout: std::time::Duration) -> Self {
        Self
    }

    pub fn available() -> bool {
        false
    }

    pub async fn fetch_rendered(&self, _url: &str) -> Result<RenderedPage> {
        Ok(RenderedPage::default())
    }
}
