//! Per-page crawl records and the semantic blocks extracted from them.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Budgets and switches for one crawl invocation.
///
/// Immutable for the duration of the crawl.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Maximum recursion depth (start page is depth 0).
    pub max_depth: u32,
    /// Maximum pages fetched in this invocation. Always >= 1.
    pub max_pages: usize,
    /// Follow links to other origins. Off by default; government sites
    /// routinely link out to state portals we don't want to walk.
    pub follow_external_links: bool,
    /// Path fragments that mark a link as worth following, in addition
    /// to the keyword tables in `scrapers::relevance`.
    pub target_path_fragments: Vec<String>,
    /// Collect relevant PDF links from visited pages.
    pub extract_pdfs: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: crate::config::DEFAULT_MAX_DEPTH,
            max_pages: crate::config::DEFAULT_MAX_PAGES,
            follow_external_links: false,
            target_path_fragments: crate::scrapers::relevance::TARGET_PATH_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extract_pdfs: true,
        }
    }
}

/// State owned by one crawl invocation.
///
/// The visited set only grows, and a URL in it is never fetched again
/// within the invocation. Sessions are never shared across crawls, so
/// concurrent crawls of different sites cannot interfere.
#[derive(Debug, Default)]
pub struct CrawlSession {
    pub visited: HashSet<String>,
    pub pages: Vec<PageRecord>,
    /// Raw markup of the start page, kept so the profile pass can run
    /// selector-based extraction without refetching.
    pub start_html: Option<String>,
}

impl CrawlSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages fetched so far (visited includes failed fetches,
    /// which still count against the page budget to avoid retry loops).
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

/// Everything extracted from a single visited page.
///
/// Produced once by the content extractor and consumed only by the
/// aggregator; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    /// Page text with navigation and boilerplate stripped.
    pub main_text: String,
    /// Same-origin links discovered on the page, deduplicated.
    pub outbound_links: Vec<String>,
    /// Application-relevant PDF links (double-filtered, see extractor).
    pub pdf_links: Vec<String>,
    pub forms: Vec<FormDescriptor>,
    pub tables: Vec<TableRecord>,
    /// Bullet/numbered list item texts, one inner vec per list.
    pub lists: Vec<Vec<String>>,
    /// Recursion depth at which the page was reached.
    pub depth: u32,
    pub fetched_at: DateTime<Utc>,
    /// Advisory content-richness score in [0, 1]. Biases nothing during
    /// the crawl; the aggregator uses it to break field conflicts.
    pub quality_score: f64,
}

/// An HTML form and its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDescriptor {
    pub action: String,
    pub method: String,
    pub fields: Vec<FieldDescriptor>,
}

/// A single input, select, or textarea within a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Input type attribute, or the tag name for select/textarea.
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub required: bool,
    /// Literal option texts; present only for enumerated inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// A table's header cells, body rows, and caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}
