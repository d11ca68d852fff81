//! Government site classification.
//!
//! City, county, and state sites lay out permit information differently
//! and emphasize different permit categories. Classification picks a
//! pattern whose selector lists and service vocabulary bias the
//! specialized extraction. The tables here are data; keep them flat.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Jurisdiction;

/// Selector lists and vocabulary for one kind of government site.
#[derive(Debug)]
pub struct GovernmentPattern {
    pub kind: Jurisdiction,
    /// Glob-style domain patterns; `*` matches any run of characters.
    pub url_globs: &'static [&'static str],
    /// Department names that suggest this kind of site.
    pub department_vocabulary: &'static [&'static str],
    /// Service wording that corroborates a department hit. A
    /// content-only match needs one hit from each list.
    pub service_indicators: &'static [&'static str],
    pub contact_selectors: &'static [&'static str],
    pub form_selectors: &'static [&'static str],
    pub hours_selectors: &'static [&'static str],
    /// Permit categories this kind of government typically offers.
    pub service_vocabulary: &'static [&'static str],
}

/// Fixed priority order: city, county, state.
pub static GOVERNMENT_PATTERNS: &[GovernmentPattern] = &[
    GovernmentPattern {
        kind: Jurisdiction::City,
        url_globs: &["*.city.*.gov", "*.ci.*.gov", "www.*.gov", "*.municipal.*.gov"],
        department_vocabulary: &[
            "building department",
            "planning department",
            "development services",
            "community development",
            "code enforcement",
            "building & safety",
        ],
        service_indicators: &[
            "building permits",
            "permit applications",
            "inspections",
            "plan review",
            "zoning",
            "variances",
        ],
        contact_selectors: &[
            ".contact-info",
            ".department-contact",
            ".office-hours",
            "#contact",
            ".address",
            ".phone",
        ],
        form_selectors: &[
            r#"a[href*=".pdf"]"#,
            r#"a[href*="form"]"#,
            r#"a[href*="application"]"#,
            ".forms-list a",
            ".downloads a",
        ],
        hours_selectors: &[
            ".hours",
            ".office-hours",
            ".business-hours",
            ".schedule",
            ".operating-hours",
        ],
        service_vocabulary: &[
            "building permits",
            "electrical permits",
            "plumbing permits",
            "mechanical permits",
            "zoning variances",
            "business licenses",
            "sign permits",
            "fence permits",
        ],
    },
    GovernmentPattern {
        kind: Jurisdiction::County,
        url_globs: &["*.county.*.gov", "*.co.*.gov", "*county*.gov"],
        department_vocabulary: &[
            "building department",
            "planning & development",
            "development services",
            "community development",
            "building & zoning",
            "planning & zoning",
        ],
        service_indicators: &[
            "building permits",
            "unincorporated areas",
            "county permits",
            "rural development",
            "subdivision review",
        ],
        contact_selectors: &[
            ".county-contact",
            ".department-info",
            ".office-location",
            ".contact-us",
        ],
        form_selectors: &[
            r#"a[href*="permit"]"#,
            r#"a[href*="application"]"#,
            r#"a[href*=".pdf"]"#,
            ".permit-forms a",
        ],
        hours_selectors: &[".county-hours", ".office-hours", ".hours-operation"],
        service_vocabulary: &[
            "building permits",
            "septic permits",
            "well permits",
            "driveway permits",
            "flood permits",
            "agricultural permits",
            "subdivision review",
            "environmental review",
        ],
    },
    GovernmentPattern {
        kind: Jurisdiction::State,
        url_globs: &["*.state.*.gov", "*.ga.gov", "georgia.gov"],
        department_vocabulary: &[
            "community affairs",
            "state fire marshal",
            "environmental protection",
            "transportation",
        ],
        service_indicators: &[
            "state permits",
            "environmental permits",
            "fire safety",
            "accessibility compliance",
        ],
        contact_selectors: &[".state-contact", ".agency-contact", ".regional-office"],
        form_selectors: &[
            r#"a[href*="state"]"#,
            r#"a[href*="permit"]"#,
            r#"a[href*="application"]"#,
        ],
        hours_selectors: &[".state-hours", ".agency-hours"],
        service_vocabulary: &[
            "fire safety permits",
            "environmental permits",
            "accessibility compliance",
            "elevator permits",
            "pressure vessel permits",
            "underground storage tanks",
        ],
    },
];

/// Fallback for government domains that match nothing specific.
/// Ambiguous sites still get best-effort extraction with generic
/// selectors rather than being dropped.
pub static DEFAULT_GOV_PATTERN: GovernmentPattern = GovernmentPattern {
    kind: Jurisdiction::City,
    url_globs: &[],
    department_vocabulary: &[],
    service_indicators: &[],
    contact_selectors: &[".contact", ".phone", ".email", ".address"],
    form_selectors: &[r#"a[href*=".pdf"]"#, r#"a[href*="form"]"#],
    hours_selectors: &[".hours", ".schedule"],
    service_vocabulary: &["building permits", "electrical permits", "zoning"],
};

/// Compiled URL globs, one vec per pattern, in table order.
static URL_GLOB_REGEXES: LazyLock<Vec<Vec<Regex>>> = LazyLock::new(|| {
    GOVERNMENT_PATTERNS
        .iter()
        .map(|pattern| {
            pattern
                .url_globs
                .iter()
                .filter_map(|glob| Regex::new(&glob_to_regex(glob)).ok())
                .collect()
        })
        .collect()
});

fn glob_to_regex(glob: &str) -> String {
    regex::escape(glob).replace(r"\*", ".*")
}

/// Classify a site from its URL shape, falling back to department and
/// service vocabulary found on the page.
///
/// Returns `None` only for sites that neither match a pattern nor live
/// under a government top-level domain.
pub fn classify(url: &str, title: &str, content: &str) -> Option<&'static GovernmentPattern> {
    let url = url.to_lowercase();
    let title = title.to_lowercase();
    let content = content.to_lowercase();

    // URL shape wins outright.
    for (pattern, regexes) in GOVERNMENT_PATTERNS.iter().zip(URL_GLOB_REGEXES.iter()) {
        if regexes.iter().any(|re| re.is_match(&url)) {
            return Some(pattern);
        }
    }

    // Content-only match needs both a department hit and a service hit.
    for pattern in GOVERNMENT_PATTERNS {
        let department_hit = pattern
            .department_vocabulary
            .iter()
            .any(|d| title.contains(d) || content.contains(d));
        let service_hit = pattern
            .service_indicators
            .iter()
            .any(|s| content.contains(s));
        if department_hit && service_hit {
            return Some(pattern);
        }
    }

    if is_government_domain(&url) {
        return Some(&DEFAULT_GOV_PATTERN);
    }

    None
}

/// Whether the URL's host sits under a US government TLD.
pub fn is_government_domain(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .is_some_and(|host| host.ends_with(".gov") || host.ends_with(".us"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_url_glob_matches() {
        let pattern = classify("https://www.atlanta.gov/permits", "", "").unwrap();
        assert_eq!(pattern.kind, Jurisdiction::City);
    }

    #[test]
    fn county_url_glob_matches() {
        let pattern = classify("https://permits.fultoncounty.gov/", "", "").unwrap();
        assert_eq!(pattern.kind, Jurisdiction::County);
    }

    #[test]
    fn vocabulary_match_needs_both_hits() {
        // Department wording alone is not enough.
        let none = classify(
            "https://example.org/",
            "Building Department",
            "welcome to our office",
        );
        assert!(none.is_none());

        let pattern = classify(
            "https://example.org/",
            "Building Department",
            "apply for building permits and schedule inspections",
        )
        .unwrap();
        assert_eq!(pattern.kind, Jurisdiction::City);
    }

    #[test]
    fn gov_tld_falls_back_to_default_city_pattern() {
        let pattern = classify("https://obscure-township.gov/", "", "nothing useful").unwrap();
        assert_eq!(pattern.kind, Jurisdiction::City);
        assert!(pattern.url_globs.is_empty());
    }

    #[test]
    fn non_government_site_is_none() {
        assert!(classify("https://example.com/", "Shop", "buy things").is_none());
    }

    #[test]
    fn county_vocabulary_emphasizes_unincorporated() {
        let pattern = classify(
            "https://example.org/",
            "Planning & Development",
            "permits for unincorporated areas",
        )
        .unwrap();
        assert_eq!(pattern.kind, Jurisdiction::County);
    }
}
