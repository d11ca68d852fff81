//! Cross-strategy merging.
//!
//! Three sources can describe the same office: the static start-page
//! pass, the dynamic rendered pass, and the related-pages sweep. The
//! merge policy lives in one function so the precedence stays a single
//! reviewable decision:
//!
//! - scalars: first non-empty, dynamic > static > related (rendered
//!   content reflects scripts-applied data and is trusted most)
//! - boolean flag maps: OR; later sources fill gaps, never clear
//! - option maps: first Some per field, same precedence
//! - form lists: concatenated, deliberately not deduplicated

use scraper::Html;
use tracing::debug;
use url::Url;

use super::crawler::PageFetcher;
use super::office_extract::{self, LinkInfo};
use crate::models::{DetailedOfficeInfo, Reliability, ScrapingMethod};

/// Path suffixes worth probing on any government origin. The related
/// pass guesses these instead of following discovered links.
pub const COMMON_GOV_PATHS: &[&str] = &[
    "/building",
    "/permits",
    "/building-permits",
    "/development",
    "/planning",
    "/zoning",
    "/code-enforcement",
    "/inspections",
    "/departments/building",
    "/departments/planning",
    "/departments/development",
    "/services/permits",
    "/services/building",
    "/permit-center",
    "/forms-and-applications",
    "/online-services",
    "/business-services",
    "/development-services",
    "/forms",
    "/applications",
    "/documents",
    "/downloads",
    "/resources",
];

/// The related-pages pass stops after this many successful fetches.
pub const RELATED_PAGE_CAP: usize = 5;

/// Merge up to three per-strategy profiles into the final record.
pub fn merge_office_info(
    static_info: DetailedOfficeInfo,
    dynamic_info: Option<DetailedOfficeInfo>,
    related_info: Option<DetailedOfficeInfo>,
) -> DetailedOfficeInfo {
    let dynamic_contributed = dynamic_info.as_ref().is_some_and(|d| !profile_is_empty(d));
    let dynamic = dynamic_info.unwrap_or_default();
    let related = related_info.unwrap_or_default();

    let scalar = |d: &str, s: &str, r: &str| -> String {
        [d, s, r]
            .iter()
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
            .unwrap_or_default()
    };

    let mut hours = dynamic.business_hours.clone();
    for source in [&static_info.business_hours, &related.business_hours] {
        for &(day, _) in super::office_extract::WEEKDAYS {
            if hours.get(day).is_none() {
                if let Some(value) = source.get(day) {
                    hours.set(day, value.to_string());
                }
            }
        }
    }

    let mut portals = dynamic.portals.clone();
    portals.merge_missing(static_info.portals.clone());
    portals.merge_missing(related.portals.clone());

    let mut fee_structure = dynamic.fee_structure.clone();
    fee_structure.merge_missing(static_info.fee_structure.clone());
    fee_structure.merge_missing(related.fee_structure.clone());

    let mut staff_contacts = dynamic.staff_contacts.clone();
    staff_contacts.merge_missing(static_info.staff_contacts.clone());
    staff_contacts.merge_missing(related.staff_contacts.clone());

    let mut process_info = dynamic.process_info.clone();
    process_info.merge_missing(static_info.process_info.clone());
    process_info.merge_missing(related.process_info.clone());

    let mut additional_info = dynamic.additional_info.clone();
    additional_info.merge_missing(static_info.additional_info.clone());
    additional_info.merge_missing(related.additional_info.clone());

    // Form lists concatenate across all sources: duplicates are cheap
    // downstream, a dropped form from a flaky strategy is not.
    let mut forms = static_info.forms.clone();
    forms.extend(dynamic.forms.clone());
    forms.extend(related.forms.clone());

    let mut merged = DetailedOfficeInfo {
        office_name: scalar(&dynamic.office_name, &static_info.office_name, &related.office_name),
        department: scalar(&dynamic.department, &static_info.department, &related.department),
        jurisdiction: dynamic
            .jurisdiction
            .or(static_info.jurisdiction)
            .or(related.jurisdiction),
        address: scalar(&dynamic.address, &static_info.address, &related.address),
        phone: scalar(&dynamic.phone, &static_info.phone, &related.phone),
        email: scalar(&dynamic.email, &static_info.email, &related.email),
        website: scalar(&static_info.website, &dynamic.website, &related.website),
        business_hours: hours,
        services: static_info.services.merge(dynamic.services).merge(related.services),
        online_services: static_info
            .online_services
            .merge(dynamic.online_services)
            .merge(related.online_services),
        portals,
        fee_structure,
        staff_contacts,
        forms,
        process_info,
        requirements: static_info.requirements,
        additional_info,
        metadata: static_info.metadata,
    };

    if dynamic_contributed {
        merged.metadata.scraping_method = ScrapingMethod::Dynamic;
        merged.metadata.source_reliability = Reliability::High;
    } else {
        merged.metadata.scraping_method = ScrapingMethod::Static;
    }

    merged
}

/// Whether a profile carries any signal at all.
pub fn profile_is_empty(info: &DetailedOfficeInfo) -> bool {
    info.office_name.is_empty()
        && info.phone.is_empty()
        && info.email.is_empty()
        && info.address.is_empty()
        && info.business_hours.is_empty()
        && info.services.count_set() == 0
        && info.online_services.count_set() == 0
        && info.forms.total() == 0
}

/// Probe common government paths off the site's origin for forms,
/// contacts, and hours the start page didn't carry.
///
/// Stops after [`RELATED_PAGE_CAP`] successful fetches. The fetcher's
/// built-in politeness delay paces the probes; failures just move on to
/// the next guess.
pub async fn scrape_related_pages(fetcher: &dyn PageFetcher, base: &Url) -> DetailedOfficeInfo {
    let mut related = DetailedOfficeInfo::default();
    let origin = base.origin().ascii_serialization();
    let mut fetched = 0usize;

    for path in COMMON_GOV_PATHS {
        if fetched >= RELATED_PAGE_CAP {
            break;
        }

        let page_url = format!("{}{}", origin, path);
        let html = match fetcher.get_text(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                debug!("related page {} unavailable: {}", page_url, e);
                continue;
            }
        };
        fetched += 1;

        let page_base = match Url::parse(&page_url) {
            Ok(u) => u,
            Err(_) => continue,
        };

        let (links, text) = {
            let document = Html::parse_document(&html);
            let links: Vec<LinkInfo> = office_extract::collect_links(&document);
            let body = document.root_element().text().collect::<Vec<_>>().join("\n");
            (links, body)
        };

        related.forms.extend(office_extract::forms_from_links(&links, &page_base));

        if related.phone.is_empty() {
            if let Some(m) = super::extract::PHONE_RE.find(&text) {
                related.phone = m.as_str().to_string();
            }
        }
        if related.email.is_empty() {
            if let Some(email) = super::extract::EMAIL_RE
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .find(|e| !e.contains("example.com"))
            {
                related.email = email;
            }
        }
        if related.business_hours.is_empty() {
            related.business_hours = office_extract::hours_from_text(&text);
        }
    }

    debug!("related-pages pass fetched {} pages", fetched);
    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormCategories, FormLink, ServiceFlags};

    fn named(name: &str) -> DetailedOfficeInfo {
        DetailedOfficeInfo {
            office_name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn dynamic_wins_scalars() {
        let static_info = named("Static Office");
        let dynamic = named("Dynamic Office");
        let merged = merge_office_info(static_info, Some(dynamic), None);
        assert_eq!(merged.office_name, "Dynamic Office");
        assert_eq!(merged.metadata.scraping_method, ScrapingMethod::Dynamic);
        assert_eq!(merged.metadata.source_reliability, Reliability::High);
    }

    #[test]
    fn static_fills_dynamic_gaps() {
        let mut static_info = named("Static Office");
        static_info.phone = "(404) 555-1234".into();
        let mut dynamic = DetailedOfficeInfo::default();
        dynamic.email = "d@example.gov".into();

        let merged = merge_office_info(static_info, Some(dynamic), None);
        assert_eq!(merged.office_name, "Static Office");
        assert_eq!(merged.phone, "(404) 555-1234");
        assert_eq!(merged.email, "d@example.gov");
    }

    #[test]
    fn absent_dynamic_pass_keeps_method_static() {
        let merged = merge_office_info(named("Office"), None, None);
        assert_eq!(merged.metadata.scraping_method, ScrapingMethod::Static);
    }

    #[test]
    fn empty_dynamic_profile_does_not_claim_dynamic() {
        let merged =
            merge_office_info(named("Office"), Some(DetailedOfficeInfo::default()), None);
        assert_eq!(merged.metadata.scraping_method, ScrapingMethod::Static);
    }

    #[test]
    fn flags_or_across_sources() {
        let mut static_info = DetailedOfficeInfo::default();
        static_info.services = ServiceFlags {
            building_permits: true,
            ..Default::default()
        };
        let mut dynamic = DetailedOfficeInfo::default();
        dynamic.services = ServiceFlags {
            electrical_permits: true,
            ..Default::default()
        };
        dynamic.office_name = "x".into();

        let merged = merge_office_info(static_info, Some(dynamic), None);
        assert!(merged.services.building_permits);
        assert!(merged.services.electrical_permits);
    }

    #[test]
    fn forms_concatenate_without_dedup() {
        let form = FormLink {
            name: "Permit Application".into(),
            url: "https://example.gov/f.pdf".into(),
            file_type: "PDF".into(),
        };
        let mut static_info = DetailedOfficeInfo::default();
        static_info.forms = FormCategories {
            building: vec![form.clone()],
            ..Default::default()
        };
        let mut related = DetailedOfficeInfo::default();
        related.forms = FormCategories {
            building: vec![form],
            ..Default::default()
        };

        let merged = merge_office_info(static_info, None, Some(related));
        assert_eq!(merged.forms.building.len(), 2);
    }

    #[test]
    fn related_only_fills_last() {
        let mut related = DetailedOfficeInfo::default();
        related.phone = "(404) 555-0000".into();
        let mut static_info = DetailedOfficeInfo::default();
        static_info.phone = "(404) 555-1111".into();

        let merged = merge_office_info(static_info, None, Some(related));
        assert_eq!(merged.phone, "(404) 555-1111");
    }

    #[test]
    fn hours_fill_day_by_day() {
        let mut dynamic = DetailedOfficeInfo::default();
        dynamic.office_name = "x".into();
        dynamic.business_hours.set("monday", "9-5".into());
        let mut static_info = DetailedOfficeInfo::default();
        static_info.business_hours.set("monday", "8-4".into());
        static_info.business_hours.set("tuesday", "8-4".into());

        let merged = merge_office_info(static_info, Some(dynamic), None);
        assert_eq!(merged.business_hours.get("monday"), Some("9-5"));
        assert_eq!(merged.business_hours.get("tuesday"), Some("8-4"));
    }
}
