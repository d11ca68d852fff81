//! Link relevance filtering.
//!
//! The crawl stays small and on-topic because candidate links must match
//! one of these fixed tables, not because of any budget alone. The
//! tables are data: keep them flat and auditable.

/// Domain vocabulary that marks a link as worth following when it
/// appears in the link text or the href.
pub const RELEVANCE_KEYWORDS: &[&str] = &[
    "permit",
    "electrical",
    "solar",
    "photovoltaic",
    "renewable",
    "wiring",
    "interconnection",
    "net metering",
    "net-metering",
    "application",
    "form",
    "fee",
    "requirement",
    "instruction",
    "checklist",
    "process",
    "timeline",
    "contact",
    "staff",
    "submit",
    "apply",
];

/// URL path fragments that mark a link as worth following regardless of
/// its text.
pub const TARGET_PATH_FRAGMENTS: &[&str] = &[
    "/permit",
    "/electrical",
    "/solar",
    "/application",
    "/form",
    "/fee",
    "/requirement",
    "/instruction",
    "/guide",
    "/checklist",
    "/process",
    "/timeline",
    "/contact",
    "/staff",
    "/department",
    "/submit",
    "/apply",
];

/// Decide whether a discovered link is worth following.
pub fn is_relevant_link(text: &str, href: &str) -> bool {
    let text = text.to_lowercase();
    let href = href.to_lowercase();

    RELEVANCE_KEYWORDS
        .iter()
        .any(|kw| text.contains(kw) || href.contains(kw))
        || TARGET_PATH_FRAGMENTS.iter().any(|path| href.contains(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_in_text_matches() {
        assert!(is_relevant_link("Electrical Permit Info", "/page/1234"));
        assert!(is_relevant_link("Apply here", "/page/1234"));
    }

    #[test]
    fn keyword_in_href_matches() {
        assert!(is_relevant_link("click here", "/documents/solar-guide"));
    }

    #[test]
    fn path_fragment_matches() {
        assert!(is_relevant_link("Main office", "https://example.gov/contact/us"));
        assert!(is_relevant_link("", "/department/building"));
    }

    #[test]
    fn unrelated_link_is_rejected() {
        assert!(!is_relevant_link("Parks and Recreation", "/parks/pools"));
        assert!(!is_relevant_link("News", "/news/2024"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(is_relevant_link("PERMIT CENTER", "/x"));
        assert!(is_relevant_link("x", "/FORMS/Building"));
    }
}
